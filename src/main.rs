use log::{error, info};
use omnis::configuration::config::Config;
use omnis::controller::Controller;

#[tokio::main]
async fn main() {
    let config = match Config::from_args() {
        Ok(config) => config,
        Err(e) => {
            // logging is not up yet, the level comes from the config
            eprintln!("Unable to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    // RUST_LOG wins over the configured level
    env_logger::Builder::new()
        .parse_filters(&config.log_level)
        .parse_default_env()
        .format_target(false)
        .init();

    println!(
        "
 ██████╗ ███╗   ███╗███╗   ██╗██╗███████╗
██╔═══██╗████╗ ████║████╗  ██║██║██╔════╝
██║   ██║██╔████╔██║██╔██╗ ██║██║███████╗
██║   ██║██║╚██╔╝██║██║╚██╗██║██║╚════██║
╚██████╔╝██║ ╚═╝ ██║██║ ╚████║██║███████║
 ╚═════╝ ╚═╝     ╚═╝╚═╝  ╚═══╝╚═╝╚══════╝
=========================================
  Network traffic dashboard v{}
=========================================
",
        env!("CARGO_PKG_VERSION")
    );

    info!("Configuration imported successfully");

    let controller = match Controller::new(config).await {
        Ok(controller) => controller,
        Err(e) => {
            error!("Unable to create a controller instance: {}, exiting...", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = controller.run().await {
        error!("Error occured in the controller process: {}, exiting...", e);
        std::process::exit(1);
    }
}
