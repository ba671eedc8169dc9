//! Service Integration Tests
//!
//! Starts the full relay on loopback against the simulated machine and talks
//! to it over TCP the way a remote client would:
//! - status subscription yields a full update, then deltas
//! - command requests reach the machine and echo back through status
//! - malformed requests get error replies, failures land on the error channel
//! - the advertiser publishes one record per socket
//!
//! Run with: `cargo test --test service_integration`

use status_relay::client::{CommandClient, StatusMirror, StatusSubscriber};
use status_relay::config::{Config, RegistryKind};
use status_relay::discovery::{MemoryRegistry, ServiceRole};
use status_relay::machine::mock::SimulatedMachine;
use status_relay::proto::{CommandParameters, Container, MessageType, TaskState};
use status_relay::StatusService;
use std::time::{Duration, Instant};

const WAIT: Duration = Duration::from_secs(5);

fn test_config() -> Config {
    let mut config = Config::default();
    config.service.loopback = true;
    config.service.poll_interval_ms = 10;
    config.service.ping_interval_ms = 0;
    config.discovery.registry = RegistryKind::Memory;
    config.machine.seed = 7;
    config
}

fn start(config: &Config) -> (SimulatedMachine, StatusService) {
    let machine = SimulatedMachine::new(&config.machine);
    let service = StatusService::start(config, machine.control_system()).unwrap();
    (machine, service)
}

fn dsn(service: &StatusService, role: ServiceRole) -> String {
    service.endpoint(role).unwrap().dsn.clone()
}

/// Receive until `accept` matches or `WAIT` runs out
fn wait_for<F>(subscriber: &mut StatusSubscriber, mut accept: F) -> (String, Container)
where
    F: FnMut(&str, &Container) -> bool,
{
    let deadline = Instant::now() + WAIT;
    while Instant::now() < deadline {
        if let Some((topic, message)) = subscriber.recv(Duration::from_millis(50)).unwrap()
            && accept(&topic, &message)
        {
            return (topic, message);
        }
    }
    panic!("no matching message within {:?}", WAIT);
}

fn request(kind: MessageType, params: Option<CommandParameters>) -> Container {
    Container {
        r#type: kind as i32,
        interp_name: Some("execute".to_string()),
        command: params,
        ..Default::default()
    }
}

fn reply(client: &mut CommandClient, message: &Container) -> Container {
    client.send(message).unwrap();
    client.recv(WAIT).unwrap().expect("reply")
}

// ============================================================================
// Tests
// ============================================================================

#[test]
fn test_endpoints_bound_on_loopback() {
    let (_machine, service) = start(&test_config());
    assert_eq!(service.endpoints().len(), 3);
    for endpoint in service.endpoints() {
        assert_ne!(endpoint.port, 0);
        assert_eq!(endpoint.dsn, format!("tcp://127.0.0.1:{}", endpoint.port));
    }
    assert!(service.is_running());
}

#[test]
fn test_subscribe_then_command_round_trip() {
    let (machine, service) = start(&test_config());
    let mut status = StatusSubscriber::connect_dsn(&dsn(&service, ServiceRole::Status)).unwrap();
    status.subscribe("task").unwrap();

    let mut mirror = StatusMirror::new();
    let (topic, full) = wait_for(&mut status, |_, m| {
        m.message_type() == Some(MessageType::FullUpdate)
    });
    assert_eq!(topic, "task");
    mirror.apply(&full);
    assert_eq!(mirror.snapshot().task.task_state, TaskState::Estop);

    let mut client = CommandClient::connect_dsn(&dsn(&service, ServiceRole::Command)).unwrap();
    client
        .send(&request(
            MessageType::TaskSetState,
            Some(CommandParameters {
                task_state: Some(TaskState::EstopReset as i32),
                ..Default::default()
            }),
        ))
        .unwrap();

    wait_for(&mut status, |topic, m| {
        assert_eq!(topic, "task");
        mirror.apply(m);
        mirror.snapshot().task.task_state == TaskState::EstopReset
    });
    assert_eq!(mirror.snapshot().task.echo_serial_number, 1);
    assert_eq!(machine.snapshot().task.echo_serial_number, 1);
}

#[test]
fn test_ping_is_acknowledged() {
    let (_machine, service) = start(&test_config());
    let mut client = CommandClient::connect_dsn(&dsn(&service, ServiceRole::Command)).unwrap();
    assert!(client.ping(WAIT).unwrap());
    assert!(client.ping(WAIT).unwrap());
}

#[test]
fn test_bad_requests_get_error_replies() {
    let (machine, service) = start(&test_config());
    let mut client = CommandClient::connect_dsn(&dsn(&service, ServiceRole::Command)).unwrap();

    let missing = reply(&mut client, &request(MessageType::AxisJog, None));
    assert_eq!(missing.message_type(), Some(MessageType::Error));
    assert_eq!(missing.note, vec!["wrong parameters".to_string()]);

    let unknown = reply(
        &mut client,
        &Container {
            r#type: 4242,
            ..Default::default()
        },
    );
    assert_eq!(unknown.message_type(), Some(MessageType::Error));
    assert_eq!(unknown.note, vec!["unknown command".to_string()]);

    // The connection stays usable and nothing reached the machine
    assert!(client.ping(WAIT).unwrap());
    assert_eq!(machine.snapshot().task.echo_serial_number, 0);
}

#[test]
fn test_failed_command_reported_on_error_channel() {
    let mut config = test_config();
    config.service.ping_interval_ms = 20;
    let (_machine, service) = start(&config);
    let mut errors = StatusSubscriber::connect_dsn(&dsn(&service, ServiceRole::Error)).unwrap();
    errors.subscribe("error").unwrap();

    // A ping on the topic shows the subscription has reached the poll loop
    wait_for(&mut errors, |_, m| m.message_type() == Some(MessageType::Ping));

    let mut client = CommandClient::connect_dsn(&dsn(&service, ServiceRole::Command)).unwrap();
    client
        .send(&request(
            MessageType::AxisHome,
            Some(CommandParameters {
                index: Some(0),
                ..Default::default()
            }),
        ))
        .unwrap();

    let (topic, message) = wait_for(&mut errors, |_, m| {
        m.message_type() == Some(MessageType::NmlError)
    });
    assert_eq!(topic, "error");
    assert_eq!(message.note.len(), 1);
    assert!(message.note[0].contains("machine is not on"), "{:?}", message.note);
}

#[test]
fn test_advertiser_publishes_three_records() {
    let config = test_config();
    let (_machine, service) = start(&config);
    let registry = MemoryRegistry::new();
    let mut advertiser = service.advertiser(Box::new(registry.clone()), &config);

    advertiser.register_all().unwrap();
    let records = registry.records();
    assert_eq!(records.len(), 3);

    let instance = advertiser.instance_id().to_string();
    for role in ServiceRole::ALL {
        let record = records.iter().find(|r| r.role == role).unwrap();
        let endpoint = service.endpoint(role).unwrap();
        assert_eq!(record.port, endpoint.port);
        assert_eq!(record.dsn(), Some(endpoint.dsn.as_str()));
        assert_eq!(record.instance(), Some(instance.as_str()));
    }

    advertiser.unregister_all();
    assert!(registry.is_empty());
}

#[test]
fn test_stop_is_idempotent() {
    let (_machine, mut service) = start(&test_config());
    service.stop();
    assert!(!service.is_running());
    service.stop();
}
