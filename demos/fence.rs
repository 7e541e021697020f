use std::time::Duration;

use ribcl::{Client, PowerAction};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Example:
    //   cargo run --example fence -- 127.0.0.1:8443 Administrator password cycle
    let mut args = std::env::args().skip(1);
    let target = args.next().ok_or("missing <host:port>")?.parse()?;
    let username = args.next().ok_or("missing <username>")?;
    let password = args.next().ok_or("missing <password>")?;
    let action = args.next().ok_or("missing <action>")?;

    let action = match action.to_ascii_lowercase().as_str() {
        "on" => PowerAction::On,
        "off" => PowerAction::Off,
        "cycle" | "reboot" => PowerAction::Cycle,
        _ => return Err("invalid action (on|off|cycle)".into()),
    };

    let mut client = Client::builder()
        .username(username)
        .password(password)
        .power_timeout(Duration::from_secs(20))
        .connect(target)?;

    client.fence(action)?;
    println!("Fence action {action} completed");

    Ok(())
}
