//! Opcode decoding into operation descriptors.
//!
//! Each prefix context gets a 256-entry table, built at compile time from the
//! usual x/y/z split of the opcode byte (`xx yyy zzz`). The executors match
//! on the descriptors and never look at raw opcode bits.
//!
//! The DD and FD prefixes share [`INDEXED`]; the executor is told which
//! index register stands in for HL. The doubly-prefixed DDCB/FDCB forms reuse
//! [`CB`], where the register field names the extra copy target.

/// 8-bit register operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reg8 {
    B,
    C,
    D,
    E,
    H,
    L,
    A,
}

/// 8-bit operand: a register, or the byte at (HL), (IX+d) or (IY+d).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    Reg(Reg8),
    Mem,
}

/// 16-bit register pair as encoded by the `p` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pair {
    Bc,
    De,
    Hl,
    Sp,
}

/// Register pair for PUSH/POP, where AF replaces SP.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackPair {
    Bc,
    De,
    Hl,
    Af,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cond {
    Nz,
    Z,
    Nc,
    C,
    Po,
    Pe,
    P,
    M,
}

/// Accumulator operations, in opcode order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AluOp {
    Add,
    Adc,
    Sub,
    Sbc,
    And,
    Xor,
    Or,
    Cp,
}

/// Rotate and shift operations, in CB opcode order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShiftOp {
    Rlc,
    Rrc,
    Rl,
    Rr,
    Sla,
    Sra,
    /// Undocumented: shifts left and sets bit 0.
    Sll,
    Srl,
}

/// One unprefixed (or DD/FD-prefixed) operation.
///
/// Wherever HL, H, L or (HL) appears, the indexed executor substitutes the
/// index register, its halves or (IX+d).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Nop,
    LdPairImm(Pair),
    /// `LD (BC),A` / `LD (DE),A`
    StoreAIndirect(Pair),
    /// `LD A,(BC)` / `LD A,(DE)`
    LoadAIndirect(Pair),
    IncPair(Pair),
    DecPair(Pair),
    Inc(Operand),
    Dec(Operand),
    LdImm(Operand),
    /// `RLCA`, `RRCA`, `RLA`, `RRA`
    RotateA(ShiftOp),
    ExAfAf,
    AddHl(Pair),
    Djnz,
    Jr,
    JrCond(Cond),
    /// `LD (nn),HL`
    StoreHlAbsolute,
    /// `LD HL,(nn)`
    LoadHlAbsolute,
    /// `LD (nn),A`
    StoreAAbsolute,
    /// `LD A,(nn)`
    LoadAAbsolute,
    Daa,
    Cpl,
    Scf,
    Ccf,
    /// `LD dst,src`
    Ld(Operand, Operand),
    Halt,
    Alu(AluOp, Operand),
    AluImm(AluOp),
    RetCond(Cond),
    Ret,
    Pop(StackPair),
    Push(StackPair),
    JpCond(Cond),
    Jp,
    CallCond(Cond),
    Call,
    Rst(u8),
    Exx,
    JpHl,
    LdSpHl,
    ExSpHl,
    ExDeHl,
    /// `OUT (n),A`
    OutImmA,
    /// `IN A,(n)`
    InAImm,
    Di,
    Ei,
    PrefixCb,
    PrefixDd,
    PrefixEd,
    PrefixFd,
    /// DD/FD in front of an opcode that does not involve HL.
    IgnorePrefix,
}

/// What a CB-prefixed opcode does to its operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CbKind {
    Shift(ShiftOp),
    Bit(u8),
    Res(u8),
    Set(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CbOp {
    pub kind: CbKind,
    pub operand: Operand,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Ld,
    Cp,
    In,
    Out,
}

/// One of the sixteen block transfer/search/I/O instructions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockOp {
    pub kind: BlockKind,
    /// Walk HL (and DE) downwards.
    pub decrement: bool,
    /// Repeat until BC (or B) runs out or the stop condition holds.
    pub repeat: bool,
}

/// One ED-prefixed operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdOp {
    /// Undefined opcode: two-byte no-op.
    Nop,
    /// `IN r,(C)`; `None` only sets flags.
    InC(Option<Reg8>),
    /// `OUT (C),r`; `None` outputs the model's zero value.
    OutC(Option<Reg8>),
    SbcHl(Pair),
    AdcHl(Pair),
    /// `LD (nn),rr`
    StorePairAbsolute(Pair),
    /// `LD rr,(nn)`
    LoadPairAbsolute(Pair),
    Neg,
    /// `RETN` and `RETI`
    Retn,
    Im(u8),
    LdIA,
    LdRA,
    LdAI,
    LdAR,
    Rrd,
    Rld,
    Block(BlockOp),
    /// `ED FE` emulator trap.
    TapePatch,
}

const fn operand(code: u8) -> Operand {
    match code & 7 {
        0 => Operand::Reg(Reg8::B),
        1 => Operand::Reg(Reg8::C),
        2 => Operand::Reg(Reg8::D),
        3 => Operand::Reg(Reg8::E),
        4 => Operand::Reg(Reg8::H),
        5 => Operand::Reg(Reg8::L),
        6 => Operand::Mem,
        _ => Operand::Reg(Reg8::A),
    }
}

const fn pair(code: u8) -> Pair {
    match code & 3 {
        0 => Pair::Bc,
        1 => Pair::De,
        2 => Pair::Hl,
        _ => Pair::Sp,
    }
}

const fn stack_pair(code: u8) -> StackPair {
    match code & 3 {
        0 => StackPair::Bc,
        1 => StackPair::De,
        2 => StackPair::Hl,
        _ => StackPair::Af,
    }
}

const fn cond(code: u8) -> Cond {
    match code & 7 {
        0 => Cond::Nz,
        1 => Cond::Z,
        2 => Cond::Nc,
        3 => Cond::C,
        4 => Cond::Po,
        5 => Cond::Pe,
        6 => Cond::P,
        _ => Cond::M,
    }
}

const fn alu_op(code: u8) -> AluOp {
    match code & 7 {
        0 => AluOp::Add,
        1 => AluOp::Adc,
        2 => AluOp::Sub,
        3 => AluOp::Sbc,
        4 => AluOp::And,
        5 => AluOp::Xor,
        6 => AluOp::Or,
        _ => AluOp::Cp,
    }
}

const fn shift_op(code: u8) -> ShiftOp {
    match code & 7 {
        0 => ShiftOp::Rlc,
        1 => ShiftOp::Rrc,
        2 => ShiftOp::Rl,
        3 => ShiftOp::Rr,
        4 => ShiftOp::Sla,
        5 => ShiftOp::Sra,
        6 => ShiftOp::Sll,
        _ => ShiftOp::Srl,
    }
}

const fn register(code: u8) -> Option<Reg8> {
    match operand(code) {
        Operand::Reg(r) => Some(r),
        Operand::Mem => None,
    }
}

const fn decode_main(opcode: u8) -> Op {
    let y = (opcode >> 3) & 7;
    let z = opcode & 7;
    let p = y >> 1;
    let q = y & 1 != 0;

    match opcode >> 6 {
        0 => match z {
            0 => match y {
                0 => Op::Nop,
                1 => Op::ExAfAf,
                2 => Op::Djnz,
                3 => Op::Jr,
                _ => Op::JrCond(cond(y - 4)),
            },
            1 if q => Op::AddHl(pair(p)),
            1 => Op::LdPairImm(pair(p)),
            2 => match (p, q) {
                (0, false) => Op::StoreAIndirect(Pair::Bc),
                (1, false) => Op::StoreAIndirect(Pair::De),
                (2, false) => Op::StoreHlAbsolute,
                (_, false) => Op::StoreAAbsolute,
                (0, true) => Op::LoadAIndirect(Pair::Bc),
                (1, true) => Op::LoadAIndirect(Pair::De),
                (2, true) => Op::LoadHlAbsolute,
                (_, true) => Op::LoadAAbsolute,
            },
            3 if q => Op::DecPair(pair(p)),
            3 => Op::IncPair(pair(p)),
            4 => Op::Inc(operand(y)),
            5 => Op::Dec(operand(y)),
            6 => Op::LdImm(operand(y)),
            _ => match y {
                0..=3 => Op::RotateA(shift_op(y)),
                4 => Op::Daa,
                5 => Op::Cpl,
                6 => Op::Scf,
                _ => Op::Ccf,
            },
        },
        1 if opcode == 0x76 => Op::Halt,
        1 => Op::Ld(operand(y), operand(z)),
        2 => Op::Alu(alu_op(y), operand(z)),
        _ => match z {
            0 => Op::RetCond(cond(y)),
            1 if q => match p {
                0 => Op::Ret,
                1 => Op::Exx,
                2 => Op::JpHl,
                _ => Op::LdSpHl,
            },
            1 => Op::Pop(stack_pair(p)),
            2 => Op::JpCond(cond(y)),
            3 => match y {
                0 => Op::Jp,
                1 => Op::PrefixCb,
                2 => Op::OutImmA,
                3 => Op::InAImm,
                4 => Op::ExSpHl,
                5 => Op::ExDeHl,
                6 => Op::Di,
                _ => Op::Ei,
            },
            4 => Op::CallCond(cond(y)),
            5 if q => match p {
                0 => Op::Call,
                1 => Op::PrefixDd,
                2 => Op::PrefixEd,
                _ => Op::PrefixFd,
            },
            5 => Op::Push(stack_pair(p)),
            6 => Op::AluImm(alu_op(y)),
            _ => Op::Rst(y * 8),
        },
    }
}

const fn touches_hl(operand: Operand) -> bool {
    matches!(operand, Operand::Mem | Operand::Reg(Reg8::H | Reg8::L))
}

/// Whether a DD/FD prefix changes the meaning of `op`.
const fn uses_index(op: Op) -> bool {
    match op {
        Op::LdPairImm(p) | Op::IncPair(p) | Op::DecPair(p) => matches!(p, Pair::Hl),
        Op::Inc(o) | Op::Dec(o) | Op::LdImm(o) | Op::Alu(_, o) => touches_hl(o),
        Op::Ld(dst, src) => touches_hl(dst) || touches_hl(src),
        Op::Pop(p) | Op::Push(p) => matches!(p, StackPair::Hl),
        Op::AddHl(_)
        | Op::StoreHlAbsolute
        | Op::LoadHlAbsolute
        | Op::JpHl
        | Op::LdSpHl
        | Op::ExSpHl
        | Op::PrefixCb => true,
        _ => false,
    }
}

const fn decode_cb(opcode: u8) -> CbOp {
    let y = (opcode >> 3) & 7;
    let kind = match opcode >> 6 {
        0 => CbKind::Shift(shift_op(y)),
        1 => CbKind::Bit(y),
        2 => CbKind::Res(y),
        _ => CbKind::Set(y),
    };
    CbOp {
        kind,
        operand: operand(opcode),
    }
}

const fn decode_ed(opcode: u8) -> EdOp {
    let y = (opcode >> 3) & 7;
    let z = opcode & 7;
    let p = y >> 1;
    let q = y & 1 != 0;

    match opcode >> 6 {
        1 => match z {
            0 => EdOp::InC(register(y)),
            1 => EdOp::OutC(register(y)),
            2 if q => EdOp::AdcHl(pair(p)),
            2 => EdOp::SbcHl(pair(p)),
            3 if q => EdOp::LoadPairAbsolute(pair(p)),
            3 => EdOp::StorePairAbsolute(pair(p)),
            4 => EdOp::Neg,
            5 => EdOp::Retn,
            6 => match y & 3 {
                0 | 1 => EdOp::Im(0),
                2 => EdOp::Im(1),
                _ => EdOp::Im(2),
            },
            _ => match y {
                0 => EdOp::LdIA,
                1 => EdOp::LdRA,
                2 => EdOp::LdAI,
                3 => EdOp::LdAR,
                4 => EdOp::Rrd,
                5 => EdOp::Rld,
                _ => EdOp::Nop,
            },
        },
        2 if z <= 3 && y >= 4 => {
            let kind = match z {
                0 => BlockKind::Ld,
                1 => BlockKind::Cp,
                2 => BlockKind::In,
                _ => BlockKind::Out,
            };
            EdOp::Block(BlockOp {
                kind,
                decrement: q,
                repeat: y >= 6,
            })
        }
        _ if opcode == 0xFE => EdOp::TapePatch,
        _ => EdOp::Nop,
    }
}

const fn build_main() -> [Op; 256] {
    let mut table = [Op::Nop; 256];
    let mut i = 0;
    while i < 256 {
        table[i] = decode_main(i as u8);
        i += 1;
    }
    table
}

const fn build_indexed() -> [Op; 256] {
    let mut table = [Op::IgnorePrefix; 256];
    let mut i = 0;
    while i < 256 {
        let op = decode_main(i as u8);
        if uses_index(op) {
            table[i] = op;
        }
        i += 1;
    }
    table
}

const fn build_cb() -> [CbOp; 256] {
    let mut table = [decode_cb(0); 256];
    let mut i = 0;
    while i < 256 {
        table[i] = decode_cb(i as u8);
        i += 1;
    }
    table
}

const fn build_ed() -> [EdOp; 256] {
    let mut table = [EdOp::Nop; 256];
    let mut i = 0;
    while i < 256 {
        table[i] = decode_ed(i as u8);
        i += 1;
    }
    table
}

/// Unprefixed opcodes.
pub static MAIN: [Op; 256] = build_main();

/// Opcodes after DD or FD.
pub static INDEXED: [Op; 256] = build_indexed();

/// Opcodes after CB, and the final byte of DDCB/FDCB.
pub static CB: [CbOp; 256] = build_cb();

/// Opcodes after ED.
pub static ED: [EdOp; 256] = build_ed();

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn main_table_spot_checks() {
        assert_eq!(MAIN[0x00], Op::Nop);
        assert_eq!(MAIN[0x01], Op::LdPairImm(Pair::Bc));
        assert_eq!(MAIN[0x22], Op::StoreHlAbsolute);
        assert_eq!(MAIN[0x36], Op::LdImm(Operand::Mem));
        assert_eq!(MAIN[0x76], Op::Halt);
        assert_eq!(MAIN[0x7E], Op::Ld(Operand::Reg(Reg8::A), Operand::Mem));
        assert_eq!(MAIN[0xBE], Op::Alu(AluOp::Cp, Operand::Mem));
        assert_eq!(MAIN[0xC3], Op::Jp);
        assert_eq!(MAIN[0xF1], Op::Pop(StackPair::Af));
        assert_eq!(MAIN[0xFF], Op::Rst(0x38));
        assert_eq!(MAIN[0xDD], Op::PrefixDd);
        assert_eq!(MAIN[0xFB], Op::Ei);
    }

    #[test]
    fn memory_to_memory_load_is_halt() {
        let mem_to_mem = Op::Ld(Operand::Mem, Operand::Mem);
        assert!(MAIN.iter().chain(INDEXED.iter()).all(|&op| op != mem_to_mem));
        assert_eq!(INDEXED[0x76], Op::IgnorePrefix);
    }

    #[test]
    fn indexed_table_keeps_only_hl_forms() {
        let handled: Vec<usize> = (0..256)
            .filter(|&i| INDEXED[i] != Op::IgnorePrefix)
            .collect();

        for opcode in [0x09, 0x21, 0x26, 0x34, 0x36, 0x66, 0x75, 0x7C, 0xAE, 0xCB, 0xE3, 0xE9, 0xF9] {
            assert!(handled.contains(&opcode), "{opcode:#04X} should be indexed");
        }
        for opcode in [0x00, 0x01, 0x3E, 0x47, 0x76, 0x78, 0xC3, 0xDD, 0xEB, 0xED, 0xFD] {
            assert!(!handled.contains(&opcode), "{opcode:#04X} should ignore the prefix");
        }
    }

    #[test]
    fn cb_table_fields() {
        assert_eq!(
            CB[0x06],
            CbOp { kind: CbKind::Shift(ShiftOp::Rlc), operand: Operand::Mem }
        );
        assert_eq!(
            CB[0x37],
            CbOp { kind: CbKind::Shift(ShiftOp::Sll), operand: Operand::Reg(Reg8::A) }
        );
        assert_eq!(CB[0x7E].kind, CbKind::Bit(7));
        assert_eq!(
            CB[0xC0],
            CbOp { kind: CbKind::Set(0), operand: Operand::Reg(Reg8::B) }
        );
    }

    #[test]
    fn ed_table_spot_checks() {
        assert_eq!(ED[0x70], EdOp::InC(None));
        assert_eq!(ED[0x71], EdOp::OutC(None));
        assert_eq!(ED[0x42], EdOp::SbcHl(Pair::Bc));
        assert_eq!(ED[0x7B], EdOp::LoadPairAbsolute(Pair::Sp));
        assert_eq!(ED[0x4D], EdOp::Retn);
        assert_eq!(ED[0x6E], EdOp::Im(0));
        assert_eq!(ED[0x7E], EdOp::Im(2));
        assert_eq!(ED[0x5F], EdOp::LdAR);
        assert_eq!(ED[0x77], EdOp::Nop);
        assert_eq!(
            ED[0xB0],
            EdOp::Block(BlockOp { kind: BlockKind::Ld, decrement: false, repeat: true })
        );
        assert_eq!(
            ED[0xAB],
            EdOp::Block(BlockOp { kind: BlockKind::Out, decrement: true, repeat: false })
        );
        assert_eq!(ED[0xFE], EdOp::TapePatch);
        assert_eq!(ED[0x00], EdOp::Nop);
        assert_eq!(ED[0xA4], EdOp::Nop);
    }
}
