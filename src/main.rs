use std::process::ExitCode;

use njunet_rs::{cli, config};

fn main() -> anyhow::Result<ExitCode> {
    let matches = cli::init().get_matches();

    if std::env::var("RUST_LOG").is_err() {
        if let Some(true) = matches.get_one::<bool>("verbose") {
            std::env::set_var("RUST_LOG", "debug");
        }
    };
    pretty_env_logger::init();

    let loaded = config::init(&matches)?;

    match matches.subcommand() {
        Some(("login", args)) => cli::handle_login_subcommand(args, &loaded),
        Some(("logout", args)) => cli::handle_logout_subcommand(args, &loaded),
        Some(("status", args)) => cli::handle_status_subcommand(args, &loaded),
        Some(("update", args)) => cli::handle_update_subcommand(args, &loaded),
        Some(("config", args)) => cli::handle_config_subcommand(args),
        _ => unimplemented!(),
    }
}
