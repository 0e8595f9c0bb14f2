// SPDX-License-Identifier: MIT OR Apache-2.0
//! Instruction rows and their control-flow effect.

use serde::{Deserialize, Serialize};
use showcase_playback::AsmLine;

/// How control leaves an instruction row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Flow {
    /// Falls through to the next row
    Next,
    /// Conditional branch; `None` when the target is indirect
    Branch(Option<u64>),
    /// Unconditional jump; `None` when the target is indirect
    Jump(Option<u64>),
    /// Leaves the function
    Return,
}

impl Flow {
    /// Whether this row ends a basic block
    pub fn ends_block(&self) -> bool {
        !matches!(self, Flow::Next)
    }

    /// Direct branch or jump target
    pub fn target(&self) -> Option<u64> {
        match self {
            Flow::Branch(target) | Flow::Jump(target) => *target,
            Flow::Next | Flow::Return => None,
        }
    }
}

/// One row of a disassembly listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instruction {
    /// Row address
    pub address: u64,
    /// Instruction text as listed
    pub text: String,
    /// Control-flow effect of the row's last instruction
    pub flow: Flow,
}

impl Instruction {
    /// Parse a listing row. Returns `None` if the address is not hex.
    pub fn parse(line: &AsmLine) -> Option<Self> {
        let address = parse_hex(&line.addr)?;
        let last = line
            .asm
            .split(';')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .last()
            .unwrap_or("");
        Some(Self {
            address,
            text: line.asm.clone(),
            flow: classify(last),
        })
    }
}

/// Parse `0x`-prefixed or bare hex
pub fn parse_hex(text: &str) -> Option<u64> {
    let text = text.trim();
    let digits = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .unwrap_or(text);
    if digits.is_empty() {
        return None;
    }
    u64::from_str_radix(digits, 16).ok()
}

fn classify(instruction: &str) -> Flow {
    let mut parts = instruction.split_whitespace();
    let mnemonic = parts.next().unwrap_or("").to_ascii_lowercase();
    let operand = parts.next().and_then(parse_hex);

    match mnemonic.as_str() {
        "ret" | "retn" | "retf" | "iret" | "hlt" => Flow::Return,
        "jmp" => Flow::Jump(operand),
        m if m.starts_with('j') || m.starts_with("loop") => Flow::Branch(operand),
        _ => Flow::Next,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(addr: &str, asm: &str) -> AsmLine {
        AsmLine::new(addr, "", asm)
    }

    #[test]
    fn test_parse_hex() {
        assert_eq!(parse_hex("00401000"), Some(0x401000));
        assert_eq!(parse_hex("0x401029"), Some(0x401029));
        assert_eq!(parse_hex("eax"), None);
        assert_eq!(parse_hex(""), None);
    }

    #[test]
    fn test_classify_rows() {
        let flow = |asm| Instruction::parse(&row("1000", asm)).map(|i| i.flow);
        assert_eq!(flow("mov    eax,DWORD PTR [ebp-0x10]"), Some(Flow::Next));
        assert_eq!(flow("jg     0x401029"), Some(Flow::Branch(Some(0x401029))));
        assert_eq!(flow("jmp    0x401011"), Some(Flow::Jump(Some(0x401011))));
        assert_eq!(flow("jmp    eax"), Some(Flow::Jump(None)));
        assert_eq!(flow("leave; ret"), Some(Flow::Return));
        assert_eq!(flow("push   ebp; mov ebp,esp; sub esp,0x18"), Some(Flow::Next));
    }

    #[test]
    fn test_bad_address_is_rejected() {
        assert!(Instruction::parse(&row("zz", "nop")).is_none());
    }
}
