use anyhow::Result;
use axum::http::StatusCode;
use connection_factory::{admin, ConnectionFactory, HEALTH_CHECK_NAME};
use ensemble_client::CoordinationClient;
use ensemble_core::{ConnectionSettings, ConnectionState, Error};
use host::Environment;
use std::io::Write;
use std::time::Duration;
use tokio::net::TcpListener;

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

// Settings pointing at a local listener standing in for an ensemble member
fn settings_for(port: u16) -> ConnectionSettings {
    ConnectionSettings::from_json_str(&format!(
        r#"{{
            "connection_timeout": 500,
            "session_timeout": 2000,
            "retry_policy": {{"type": "forever", "sleep_between": 20}},
            "ensemble": "127.0.0.1:{port}",
            "namespace": "app"
        }}"#
    ))
    .expect("valid settings")
}

#[tokio::test]
async fn test_full_lifecycle() -> Result<()> {
    init_tracing();

    // 1. Stand up an ensemble member
    let member = TcpListener::bind("127.0.0.1:0").await?;
    let port = member.local_addr()?.port();

    // 2. Build through the factory
    let (environment, lifecycle, health) = Environment::standalone();
    let config = settings_for(port).into_config()?;
    let client = ConnectionFactory::new(environment).build(&config)?;

    assert_eq!(lifecycle.managed_count(), 1);
    assert_eq!(health.names(), vec![HEALTH_CHECK_NAME]);
    assert_eq!(client.state(), ConnectionState::Latent);
    assert_eq!(client.namespaced_path("/leader")?, "/app/leader");

    // 3. Unhealthy until the host starts
    let before = health.run_health_check(HEALTH_CHECK_NAME).unwrap();
    assert!(!before.healthy);
    assert_eq!(admin::health_report(&health).0, StatusCode::INTERNAL_SERVER_ERROR);

    // 4. Start the host; the client connects
    lifecycle.start_all().await?;
    let (_peer, _) = member.accept().await?;
    assert!(client.block_until_connected(Duration::from_secs(5)).await);

    assert!(health.run_health_check(HEALTH_CHECK_NAME).unwrap().healthy);
    assert_eq!(admin::health_report(&health).0, StatusCode::OK);

    // 5. Stop the host; the client closes
    lifecycle.stop_all().await?;
    assert_eq!(client.state(), ConnectionState::Closed);
    assert!(!health.run_health_check(HEALTH_CHECK_NAME).unwrap().healthy);

    Ok(())
}

#[tokio::test]
async fn test_unreachable_ensemble_reports_unhealthy() -> Result<()> {
    init_tracing();

    let port = portpicker::pick_unused_port().expect("No ports free");
    let (environment, lifecycle, health) = Environment::standalone();
    let config = settings_for(port).into_config()?;
    let client = ConnectionFactory::new(environment).build(&config)?;

    lifecycle.start_all().await?;
    assert!(!client.block_until_connected(Duration::from_millis(300)).await);

    let result = health.run_health_check(HEALTH_CHECK_NAME).unwrap();
    assert!(!result.healthy);
    assert!(result.message.unwrap().starts_with("Client not connected"));

    lifecycle.stop_all().await?;
    Ok(())
}

#[tokio::test]
async fn test_settings_file_to_handle() -> Result<()> {
    let mut file = tempfile::NamedTempFile::new()?;
    write!(
        file,
        r#"{{
            "connection_timeout": 5000,
            "session_timeout": 30000,
            "ensemble": "host1:2181,host2:2181/root",
            "read_only": true,
            "namespace": "services/billing",
            "compression": {{"type": "gzip", "level": 9}}
        }}"#
    )?;

    let config = ConnectionSettings::load(file.path())?.into_config()?;
    let (environment, _lifecycle, _health) = Environment::standalone();
    let client = ConnectionFactory::new(environment).build(&config)?;

    let options = client.options();
    assert_eq!(options.connection_timeout_ms, 5000);
    assert_eq!(options.session_timeout_ms, 30000);
    assert!(client.can_be_read_only());
    assert_eq!(client.ensemble().servers().len(), 2);
    assert_eq!(client.ensemble().chroot(), Some("/root"));
    assert_eq!(client.namespace(), Some("services/billing"));
    assert_eq!(
        client.namespaced_path("/invoices")?,
        "/services/billing/invoices"
    );

    let payload = b"invoice-42".repeat(64);
    let compressed = client.compress("/invoices", &payload)?;
    assert_eq!(&client.decompress("/invoices", &compressed)?[..], &payload[..]);

    client.close().await?;
    Ok(())
}

#[tokio::test]
async fn test_second_handle_needs_its_own_health_check_name() -> Result<()> {
    let (environment, lifecycle, health) = Environment::standalone();
    let factory = ConnectionFactory::new(environment);
    let config = settings_for(2181).into_config()?;

    let first = factory.build(&config)?;

    // The standalone registry keeps names unique
    let duplicate = factory.build(&config);
    assert!(matches!(duplicate, Err(Error::HealthCheckExists { .. })));

    let second = factory.build_named(&config, "curator-secondary")?;
    assert_ne!(first.id(), second.id());
    assert_eq!(health.names(), vec!["curator", "curator-secondary"]);
    // The rejected build was already managed when its health check name collided
    assert_eq!(lifecycle.managed_count(), 3);

    Ok(())
}

#[tokio::test]
async fn test_invalid_settings_never_reach_the_factory() -> Result<()> {
    let settings = ConnectionSettings::from_json_str(r#"{"ensemble": "host1:2181,,host2"}"#)?;
    assert!(matches!(
        settings.into_config(),
        Err(Error::InvalidConfig { .. })
    ));
    Ok(())
}
