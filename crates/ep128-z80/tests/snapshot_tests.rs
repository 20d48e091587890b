//! Save/load of the register file through every snapshot layout.

use ep128_core::SimpleBus;
use ep128_z80::{CpuFlags, SnapshotError, SnapshotVersion, Z80, ZF};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A CPU with every register holding something distinctive.
fn busy_cpu() -> Z80 {
    let mut cpu = Z80::new();
    let regs = cpu.registers_mut();
    regs.set_af(0x1234);
    regs.set_bc(0x2345);
    regs.set_de(0x3456);
    regs.set_hl(0x4567);
    regs.set_af_alt(0x5678);
    regs.set_bc_alt(0x6789);
    regs.set_de_alt(0x789A);
    regs.set_hl_alt(0x89AB);
    regs.ix = 0x9ABC;
    regs.iy = 0xABCD;
    regs.sp = 0xBCDE;
    regs.pc = 0xCDEF;
    regs.i = 0x3F;
    regs.r = 0xA5;
    regs.iff1 = true;
    regs.iff2 = true;
    regs.im = 2;
    regs.vector_base = 0xFE;
    cpu.trigger_interrupt();
    cpu
}

#[test]
fn round_trip_every_version() {
    let cpu = busy_cpu();
    for version in [SnapshotVersion::V0, SnapshotVersion::V1, SnapshotVersion::V2] {
        let data = cpu.save_state_version(version);
        assert_eq!(data.len(), version.encoded_len(), "{version:?}");

        let mut restored = Z80::new();
        restored
            .load_state(&data)
            .unwrap_or_else(|err| panic!("{version:?}: {err}"));
        assert_eq!(restored.registers(), cpu.registers(), "{version:?}");
        assert_eq!(restored.cpu_flags(), cpu.cpu_flags() & CpuFlags::PERSISTENT);
    }
}

#[test]
fn restored_cpu_keeps_running() {
    let mut bus = SimpleBus::new();
    // LD A,0x10; INC A; INC A
    bus.load(0x0000, &[0x3E, 0x10, 0x3C, 0x3C]);
    let mut cpu = Z80::new();
    cpu.execute_instruction(&mut bus);
    cpu.execute_instruction(&mut bus);
    let data = cpu.save_state();

    let mut restored = Z80::new();
    restored.load_state(&data).expect("valid snapshot");
    restored.execute_instruction(&mut bus);
    assert_eq!(restored.a(), 0x12);
    assert_eq!(restored.pc(), 0x0004);
}

#[test]
fn halt_and_pending_pc_survive() {
    let mut bus = SimpleBus::new();
    bus.load(0x0000, &[0x76]);
    let mut cpu = Z80::new();
    cpu.execute_instruction(&mut bus);
    cpu.set_program_counter(0x4000);

    let mut restored = Z80::new();
    restored.load_state(&cpu.save_state()).expect("valid snapshot");
    assert!(restored.is_halted());
    assert_eq!(restored.program_counter(), 0x4000);

    restored.execute_instruction(&mut bus);
    assert_eq!(restored.pc(), 0x4000);
    assert!(!restored.is_halted());
}

#[test]
fn version_0_drops_pending_pc() {
    let mut cpu = Z80::new();
    cpu.set_program_counter(0x4000);
    let data = cpu.save_state_version(SnapshotVersion::V0);

    let mut restored = Z80::new();
    restored.load_state(&data).expect("valid snapshot");
    assert_eq!(restored.program_counter(), 0x0000);
    assert!(!restored.cpu_flags().contains(CpuFlags::SET_PC));
}

#[test]
fn unknown_version_leaves_reset_state() {
    init_logger();
    let mut data = busy_cpu().save_state();
    data[..4].copy_from_slice(&0x0200_0000u32.to_be_bytes());

    let mut cpu = busy_cpu();
    assert_eq!(
        cpu.load_state(&data),
        Err(SnapshotError::UnsupportedVersion(0x0200_0000))
    );
    let regs = cpu.registers();
    assert_eq!(regs.pc, 0);
    assert_eq!(regs.af(), u16::from(ZF));
    assert_eq!(regs.ix, 0xFFFF);
    assert_eq!(regs.iy, 0xFFFF);
    assert!(cpu.cpu_flags().is_empty());
}

#[test]
fn length_is_checked_against_the_tag() {
    init_logger();
    let data = busy_cpu().save_state_version(SnapshotVersion::V1);

    let mut cpu = Z80::new();
    assert_eq!(
        cpu.load_state(&data[..40]),
        Err(SnapshotError::Truncated { expected: 48, actual: 40 })
    );
    assert_eq!(cpu.registers().pc, 0);

    let mut long = data.clone();
    long.push(0);
    assert_eq!(
        cpu.load_state(&long),
        Err(SnapshotError::TrailingBytes { expected: 48, actual: 49 })
    );

    assert_eq!(
        cpu.load_state(&data[..2]),
        Err(SnapshotError::Truncated { expected: 4, actual: 2 })
    );
}

#[test]
fn tags_are_stable() {
    assert_eq!(SnapshotVersion::CURRENT, SnapshotVersion::V2);
    for version in [SnapshotVersion::V0, SnapshotVersion::V1, SnapshotVersion::V2] {
        assert_eq!(SnapshotVersion::from_tag(version.tag()), Some(version));
    }
    assert_eq!(SnapshotVersion::from_tag(0x0100_0003), None);
}
