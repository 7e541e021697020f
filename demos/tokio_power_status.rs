#[cfg(feature = "async")]
mod enabled {
    use ribcl::AsyncClient;

    #[tokio::main(flavor = "current_thread")]
    pub async fn main() -> Result<(), Box<dyn std::error::Error>> {
        // Example:
        //   cargo run --example tokio_power_status --features async -- 127.0.0.1:8443 Administrator password
        let mut args = std::env::args().skip(1);
        let target = args.next().ok_or("missing <host:port>")?.parse()?;
        let username = args.next().ok_or("missing <username>")?;
        let password = args.next().ok_or("missing <password>")?;

        let mut client = AsyncClient::builder()
            .username(username)
            .password(password)
            .connect_async(target)
            .await?;

        println!("Host power: {}", client.get_power_status().await?);

        Ok(())
    }
}

#[cfg(feature = "async")]
fn main() -> Result<(), Box<dyn std::error::Error>> {
    enabled::main()
}

#[cfg(not(feature = "async"))]
fn main() {
    eprintln!("This example requires feature `async`.");
}
