use gpuscope::format::Magnitude;
use gpuscope::parser::{parse_tegrastats, GPU_NAME};
use gpuscope::telemetry::TelemetrySnapshot;

fn parse(line: &str) -> TelemetrySnapshot {
    parse_tegrastats(line).expect("failed to parse sample")
}

#[test]
fn parses_orin_timestamp_and_load() {
    let line = "01-03-2023 16:10:22 RAM 2257/30536MB (lfb 5392x4MB) SWAP 0/15268MB (cached 0MB) CPU [10%@729,20%@729,30%@729,40%@729,50%@729,0%@729,60%@729,70%@729,80%@729,90%@729,100%@729,0%@729] EMC_FREQ 0% GR3D_FREQ 75% CV0@-256C CPU@41.375C Tboard@29C SOC2@39C Tdiode@30.75C SOC0@38.906C CV1@-256C GPU@-256C tj@41.468C SOC1@38.843C CV2@-256C";
    let snapshot = parse(line);
    assert_eq!(snapshot.timestamp.as_deref(), Some("01-03-2023 16:10:22"));
    assert_eq!(snapshot.device_keys(), vec![GPU_NAME]);
    assert_eq!(snapshot.devices[0].load(), Some(75.0));
    assert_eq!(snapshot.temperatures.len(), 7);
    // the GPU sensor is powered down on this sample
    assert_eq!(snapshot.gpu_temperatures().count(), 0);
}

#[test]
fn parses_xavier_frequency() {
    let line = "RAM 4181/7771MB (lfb 8x4MB) SWAP 0/3885MB (cached 0MB) CPU [10%@1190,0%@1190,1%@1190,0%@1190,5%@1190,1%@1190] EMC_FREQ 15%@1600 GR3D_FREQ 3%@1377 PLL@42.906C Tdiode@43.25C Tboard@36C GPU@41.75C BCPU@42.5C MCPU@47.5C thermal@42.425C VDD_SYS_GPU 47mW/0mW VDD_IN 3539mW/1422mW";
    let snapshot = parse(line);
    let gpu = &snapshot.devices[0];
    assert_eq!(gpu.load(), Some(3.0));
    let freq = gpu.freq.as_ref().unwrap();
    assert_eq!(freq.cur, 1377.0);
    assert_eq!(freq.unit, Magnitude::Mega);
    assert_eq!(snapshot.gpu_temperatures().collect::<Vec<_>>(), vec![("GPU", 41.75)]);
}

#[test]
fn parses_verbose_gpc_frequencies() {
    let line = "11-30-2025 13:26:01 RAM 2461/7620MB (lfb 3x2MB) SWAP 1243/3810MB (cached 5MB) CPU [19%@729,14%@729,22%@729,8%@729,15%@729,17%@729] EMC_FREQ 4%@2133 GR3D_FREQ 0%@[305,305] NVDEC off NVJPG off VIC off OFA off APE 200 cpu@46.531C soc2@47.312C soc0@46.593C gpu@48.218C tj@48.843C soc1@48.843C VDD_IN 5704mW/5704mW";
    let snapshot = parse(line);
    assert_eq!(snapshot.subunit_counts(), vec![2]);
    assert_eq!(snapshot.devices[0].subunits(), &[305.0, 305.0]);
    assert_eq!(snapshot.gpu_temperatures().count(), 1);
}

#[test]
fn tolerates_lines_without_a_gpu_engine() {
    let line = "RAM 624/1999MB (lfb 7x4MB) SWAP 0/999MB (cached 0MB) CPU [2%@1190,1%@1190] EMC_FREQ 0%@1600 PLL@38.0C Tboard@31C";
    let snapshot = parse(line);
    assert!(snapshot.devices.is_empty());
    assert_eq!(snapshot.temperatures.get("PLL"), Some(&38.0));
}
