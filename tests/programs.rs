use std::str::FromStr;

use color_eyre::eyre::Result;
use silver8::config::RuntimeConfig;
use silver8::machine::Machine;
use silver8::processor::{Fault, Step, Warning};
use silver8::program::{Assembler, Program};

fn run(source: &str, config: RuntimeConfig) -> Result<(Machine, String)> {
    let program = Assembler::new(config.max_program_size).assemble(source)?;
    let mut machine = Machine::boot(config, &program)?;
    let mut out: Vec<u8> = Vec::new();
    machine.run(&mut out)?;
    Ok((machine, String::from_utf8(out)?))
}

#[test]
fn hello_prints_from_the_character_table() -> Result<()> {
    let (machine, out) = run(include_str!("../demos/hello.s8"), RuntimeConfig::default())?;

    assert_eq!(out, "hello\n");
    assert_eq!(machine.processor.executed_instructions, 7);

    Ok(())
}

#[test]
fn countdown_loops_until_zero() -> Result<()> {
    let (machine, out) = run(
        include_str!("../demos/countdown.s8"),
        RuntimeConfig::default(),
    )?;

    assert_eq!(out, "0 50 40 30 20 1");
    assert_eq!(machine.processor.registers.get(0), Some(0));
    assert_eq!(machine.processor.executed_instructions, 22);
    assert_eq!(machine.processor.fault, None);

    Ok(())
}

#[test]
fn screen_renders_video_memory() -> Result<()> {
    let (_, out) = run(include_str!("../demos/screen.s8"), RuntimeConfig::default())?;

    let mut expected = String::from("Free Video Memory: 253 bytes\n\n---- Output ----\n");
    expected.push_str("Hi!.............\n");
    for _ in 1..16 {
        expected.push_str("................\n");
    }
    expected.push_str("----------------\n");
    assert_eq!(out, expected);

    Ok(())
}

#[test]
fn store_reaches_video_memory_past_system_memory() -> Result<()> {
    let config = RuntimeConfig {
        mem_size: 100,
        vmem_size: 64,
        max_program_size: 100,
        reg_count: 2,
        screen_width: 8,
        screen_height: 8,
    };
    // 100 + 19 is cell (3, 2)
    let (machine, _) = run("LOAD 1 88 STORE 1 119 HALT", config)?;

    assert_eq!(machine.memory.video()[19], 88);
    assert_eq!(machine.memory.read_video(19 % 8, 19 / 8), Some(88));

    Ok(())
}

#[test]
fn warnings_do_not_stop_the_machine() -> Result<()> {
    let config = RuntimeConfig {
        mem_size: 100,
        vmem_size: 64,
        max_program_size: 100,
        reg_count: 2,
        screen_width: 8,
        screen_height: 8,
    };
    let program = Program::from_str("STORE 0 200 STOREVMEM 0 8 8 PRNTREG 2 LOAD 1 1 HALT")?;
    let mut machine = Machine::boot(config, &program)?;
    let mut out: Vec<u8> = Vec::new();

    let mut steps = Vec::new();
    while machine.is_running() {
        steps.push(machine.step(&mut out)?);
    }

    assert_eq!(
        steps,
        vec![
            Step::Warning(Warning::InvalidAddress { addr: 200 }),
            Step::Warning(Warning::InvalidCoordinates { x: 8, y: 8 }),
            Step::Warning(Warning::InvalidRegister { reg: 2 }),
            Step::Continue,
            Step::Halted,
        ]
    );
    assert_eq!(machine.processor.registers.get(1), Some(1));

    Ok(())
}

#[test]
fn unknown_mnemonic_assembles_to_nop() -> Result<()> {
    // `LOAD` spelled wrong becomes a NOP and its operands run as code
    let (machine, _) = run("LAOD 0 42 HALT", RuntimeConfig::default())?;

    assert_eq!(
        machine.processor.fault,
        Some(Fault::UnknownInstruction { opcode: 42 })
    );
    assert_eq!(machine.processor.executed_instructions, 3);
    assert_eq!(machine.processor.registers.get(0), Some(0));

    Ok(())
}

#[test]
fn oversized_program_fails_before_running() {
    let config = RuntimeConfig {
        max_program_size: 8,
        ..RuntimeConfig::default()
    };
    let source = "LOAD 0 1 LOAD 1 2 ADD 0 1 HALT";

    assert!(Assembler::new(config.max_program_size)
        .assemble(source)
        .is_err());
}

#[test]
fn clear_wipes_the_running_program() -> Result<()> {
    let config = RuntimeConfig {
        mem_size: 32,
        vmem_size: 4,
        max_program_size: 32,
        reg_count: 2,
        screen_width: 2,
        screen_height: 2,
    };
    let (machine, out) = run("LOAD 0 9 STOREVMEM 0 1 1 CLR", config)?;

    // after CLR only zero bytes (NOPs) are left until the end of memory
    assert_eq!(out, "memory cleared.\n");
    assert_eq!(machine.memory.free_system(), 32);
    assert_eq!(machine.memory.read_video(1, 1), Some(9));
    assert_eq!(
        machine.processor.fault,
        Some(Fault::ProgramCounterOutOfBounds { pc: 32 })
    );

    Ok(())
}
