//! Command-line control of a PlantCare device
//!
//! ```text
//! cargo run --example plant_care -- <host> <light|pump> [on|off|<level>]
//! cargo run --example plant_care -- <host> poll [seconds]
//! ```

use plant_care::{
    ConfigFlow, Entity, FlowResult, LightEntity, PlantCareDevice, PlantCareIntegration, Poller,
    StateUpdate, SwitchEntity, UserInput,
};
use std::time::Duration;

fn usage() -> ! {
    eprintln!("usage: plant_care <host> <light|pump> [on|off|<level>]");
    eprintln!("       plant_care <host> poll [seconds]");
    std::process::exit(2);
}

fn set_up(host: String) -> Result<PlantCareDevice, Box<dyn std::error::Error>> {
    let mut flow = ConfigFlow::new();
    let entry = match flow.step_user(Some(UserInput { host })) {
        FlowResult::CreateEntry(entry) => entry,
        other => return Err(format!("could not configure device: {:?}", other).into()),
    };
    Ok(PlantCareIntegration::new().setup_entry(&entry)?)
}

fn control(device: &PlantCareDevice, target: &str, action: Option<&str>) -> plant_care::Result<()> {
    match (target, action) {
        ("light", None) => {
            device.light.update()?;
        }
        ("light", Some("on")) => device.light.turn_on(None)?,
        ("light", Some("off")) => device.light.turn_off()?,
        ("light", Some(level)) => {
            let level = level.parse().unwrap_or_else(|_| usage());
            device.light.turn_on(Some(level))?;
        }
        ("pump", None) => {
            device.pump.update()?;
        }
        ("pump", Some("on")) => device.pump.turn_on()?,
        ("pump", Some("off")) => device.pump.turn_off()?,
        _ => usage(),
    }

    let entity: &dyn Entity = if target == "light" {
        device.light.as_ref()
    } else {
        device.pump.as_ref()
    };
    println!("{}: {}", entity.name(), serde_json::to_string(&entity.state()).unwrap_or_default());
    Ok(())
}

async fn poll(device: PlantCareDevice, period: Duration) -> plant_care::Result<()> {
    let mut poller = Poller::new(device.entities(), period)?;
    let mut updates = poller.subscribe();
    poller.start();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            update = updates.recv() => match update {
                Ok(StateUpdate::Refreshed(state)) => {
                    println!("{} power={:?} on={:?}", state.unique_id, state.power, state.is_on);
                }
                Ok(StateUpdate::Failed { unique_id, error }) => {
                    println!("{} unavailable: {}", unique_id, error);
                }
                Err(e) => {
                    eprintln!("{}", e);
                    break;
                }
            }
        }
    }

    poller.stop().await;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let mut args = std::env::args().skip(1);
    let host = args.next().unwrap_or_else(|| usage());
    let target = args.next().unwrap_or_else(|| usage());
    let action = args.next();

    // Client construction and requests block, keep them off the async workers
    let device = tokio::task::spawn_blocking(move || set_up(host).map_err(|e| e.to_string()))
        .await??;

    if target == "poll" {
        let secs = action.as_deref().map_or(Ok(10), str::parse::<u64>)?;
        poll(device, Duration::from_secs(secs)).await?;
        return Ok(());
    }

    let result = tokio::task::spawn_blocking(move || {
        control(&device, &target, action.as_deref())
    })
    .await?;
    result?;
    Ok(())
}
