use std::time::Duration;

use ribcl::Client;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Example (plain TCP, e.g. through a local TLS tunnel to the iLO):
    //   cargo run --example power_status -- 127.0.0.1:8443 Administrator password
    let mut args = std::env::args().skip(1);
    let target = args.next().ok_or("missing <host:port>")?.parse()?;
    let username = args.next().ok_or("missing <username>")?;
    let password = args.next().ok_or("missing <password>")?;

    let mut client = Client::builder()
        .username(username)
        .password(password)
        .login_timeout(Duration::from_secs(10))
        .connect(target)?;

    println!(
        "RIBCL {} ({:?}), capabilities: {:?}",
        client.protocol_version(),
        client.dialect(),
        client.capabilities()
    );
    println!("Host power: {}", client.get_power_status()?);

    Ok(())
}
