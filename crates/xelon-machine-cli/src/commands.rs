use crate::Commands;
use colored::Colorize;
use xelon_api::CancellationToken;
use xelon_machine::{DeviceHandle, DriverConfig, MachineDriver, MachineState, XelonDriver};

pub async fn run(command: Commands, config: DriverConfig, handle: DeviceHandle) -> anyhow::Result<()> {
    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling...");
            ctrl_c.cancel();
        }
    });

    let name = config.machine_name.clone();
    let mut driver = XelonDriver::new(config)?
        .with_handle(handle)
        .with_cancellation(cancel);

    match command {
        Commands::Create => create(&mut driver).await?,
        Commands::Start => {
            driver.start().await?;
            println!("{} {}", "✓ Started".green(), name.cyan());
        }
        Commands::Stop => {
            driver.stop().await?;
            println!("{} {}", "✓ Stopped".green(), name.cyan());
        }
        Commands::Restart => {
            driver.restart().await?;
            println!("{} {}", "✓ Restarted".green(), name.cyan());
        }
        Commands::Kill => {
            driver.kill().await?;
            println!("{} {}", "✓ Stop requested for".green(), name.cyan());
        }
        Commands::Remove => {
            driver.remove().await?;
            println!("{} {}", "✓ Removed".green(), name.cyan());
        }
        Commands::Status => {
            let state = driver.get_state().await?;
            println!("{}", colorize(state));
        }
        Commands::Url => println!("{}", driver.get_url().await?),
        Commands::SshHostname => println!("{}", driver.get_ssh_hostname().await?),
        Commands::Version => println!("xelon-machine {}", env!("CARGO_PKG_VERSION")),
    }

    Ok(())
}

async fn create(driver: &mut XelonDriver) -> anyhow::Result<()> {
    driver.pre_create_check()?;

    eprintln!(
        "{} {}",
        "Creating".blue().bold(),
        driver.config().machine_name.cyan()
    );
    let handle = driver.create().await?;
    eprintln!("{}", "✓ Device is ready".green());

    // stdout carries only the identifiers the caller has to keep
    println!("{}", serde_json::to_string_pretty(&handle)?);
    Ok(())
}

fn colorize(state: MachineState) -> colored::ColoredString {
    let text = state.to_string();
    match state {
        MachineState::Running => text.green(),
        MachineState::Starting => text.yellow(),
        MachineState::Stopped => text.normal(),
        MachineState::NotFound => text.red(),
    }
}
