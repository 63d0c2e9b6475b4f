//! Host reader against a running sampler

use lsw_common::{LineMask, LswConfig, MappedRegion, RegionError, SharedMemoryMap};
use lsw_host::{HostError, LimitReader, LimitSample, Monitor};
use lsw_sampler::control::{LimitSampler, SamplerSettings};
use lsw_sampler::delay::DebounceDelay;
use lsw_sampler::sim::{Pulse, SimBoard, SimClock};
use std::sync::atomic::AtomicBool;
use std::time::{Duration, Instant};
use tempfile::TempDir;

#[test]
fn test_concurrent_sampler_and_host() {
    let map = SharedMemoryMap::new();
    // 1 cycle = 1us; a new sample every ~2ms while the line is held.
    let sim = SimBoard::new(&map, SimClock::Wall { clock_hz: 1_000_000 })
        .with_pulse(Pulse::new(0, u64::MAX, LineMask::ACTUATOR_2_WARM));
    let settings = SamplerSettings {
        debounce: DebounceDelay::from_cycles(2_000),
        ..SamplerSettings::default()
    };
    let sibling_done = AtomicBool::new(false);

    let (report, packets) = std::thread::scope(|s| {
        s.spawn(|| sim.run_sibling(&sibling_done, Duration::from_millis(1)));
        let sampler = s.spawn(|| LimitSampler::new(&map, sim.board(), settings).run());

        let mut reader = LimitReader::new(&map);
        let mut packets = Vec::new();
        let give_up = Instant::now() + Duration::from_secs(10);
        while packets.len() < 5 && Instant::now() < give_up {
            if let Some(packet) = reader.poll().unwrap() {
                packets.push(packet);
            }
            std::thread::sleep(Duration::from_micros(200));
        }
        reader.request_stop();

        let report = sampler.join().unwrap();
        sibling_done.store(true, std::sync::atomic::Ordering::Release);
        (report, packets)
    });

    assert_eq!(packets.len(), 5);
    assert!(packets.iter().all(|p| p.is_header_valid()));
    assert!(packets.iter().all(|p| p.lines() == LineMask::ACTUATOR_2_WARM));
    assert!(
        packets
            .windows(2)
            .all(|w| w[0].absolute_ticks() < w[1].absolute_ticks())
    );
    assert!(report.published >= packets.len() as u64);
    assert_eq!(sim.signals().len(), 1);
}

#[test]
fn test_host_attaches_to_sampler_region() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("lsw_region");

    let region = MappedRegion::create(&path).unwrap();
    let sim = SimBoard::new(&region, SimClock::Virtual)
        .with_pulse(Pulse::new(50, 10, LineMask::ACTUATOR_3_COLD));
    sim.request_stop_at(10_000);
    let report = LimitSampler::new(&region, sim.board(), SamplerSettings::default()).run();
    assert_eq!(report.published, 1);

    let mut reader = LimitReader::attach(&path).unwrap();
    let packet = reader.poll().unwrap().unwrap();
    assert_eq!(packet.lines(), LineMask::ACTUATOR_3_COLD);
    assert_eq!(packet.clock, 51);

    // The host's stop request lands in the sampler's view of the region.
    region.run_flag.store(0, std::sync::atomic::Ordering::Release);
    reader.request_stop();
    assert!(region.stop_requested());
}

#[test]
fn test_attach_missing_region() {
    let dir = TempDir::new().unwrap();
    let result = LimitReader::attach(&dir.path().join("absent"));
    assert!(matches!(
        result,
        Err(HostError::Region(RegionError::NotFound { .. }))
    ));
}

#[test]
fn test_monitor_decodes_sampler_output() {
    let config = LswConfig::from_toml(
        r#"
[timing]
clock_hz = 1000
debounce_ms = 5

[[lines]]
bit = 3
name = "Gripper Open"

[[lines]]
bit = 4
name = "Gripper Closed"

[simulation]
relay_lag_cycles = 0

[[simulation.pulses]]
at_ms = 2000
hold_ms = 1
bits = [3, 4]
"#,
    )
    .unwrap();

    let map = SharedMemoryMap::new();
    let sim = SimBoard::from_config(&map, &config, SimClock::Virtual);
    sim.request_stop_at(3_000);
    LimitSampler::new(&map, sim.board(), SamplerSettings::from_config(&config)).run();

    let mut monitor = Monitor::new(LimitReader::new(&map), config);
    let sample: LimitSample = monitor.tick(Instant::now()).unwrap();

    assert_eq!(sample.lines, vec!["Gripper Open", "Gripper Closed"]);
    assert_eq!(sample.ticks, sample.clock as u64);
    assert!((sample.seconds - 2.004).abs() < 1e-9);
}
