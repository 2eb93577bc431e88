//! Cyclomatic complexity from bytecode control flow.
//!
//! A method's complexity is its number of branch points plus one. Branch points
//! are either precomputed by the class-file reader (`branch_count`) or counted
//! here by walking the raw `Code` array:
//! - every conditional jump (`ifeq`..`if_acmpne`, `ifnull`, `ifnonnull`) is one
//! - every non-default `tableswitch`/`lookupswitch` case is one
//! - every exception handler entry is one
//!
//! Unconditional jumps (`goto`, `jsr`) do not add paths.

use crate::model::{ClassDescriptor, MethodDescriptor};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BytecodeError {
    #[error("code truncated inside instruction at offset {offset}")]
    Truncated { offset: usize },
    #[error("unknown opcode 0x{opcode:02x} at offset {offset}")]
    UnknownOpcode { opcode: u8, offset: usize },
    #[error("invalid switch bounds at offset {offset}")]
    InvalidSwitch { offset: usize },
}

const TABLESWITCH: u8 = 0xaa;
const LOOKUPSWITCH: u8 = 0xab;
const WIDE: u8 = 0xc4;
const IINC: u8 = 0x84;

/// Counts branch points in a method's `Code` array.
pub fn count_branch_points(code: &[u8]) -> Result<u32, BytecodeError> {
    let mut pc = 0usize;
    let mut branches = 0u32;

    while pc < code.len() {
        let opcode = code[pc];
        let length = match opcode {
            TABLESWITCH => {
                let operands = switch_operands_start(pc);
                let low = read_i32(code, operands + 4, pc)?;
                let high = read_i32(code, operands + 8, pc)?;
                if high < low {
                    return Err(BytecodeError::InvalidSwitch { offset: pc });
                }
                let cases = (i64::from(high) - i64::from(low) + 1) as usize;
                branches = branches.saturating_add(cases as u32);
                operands + 12 + cases * 4 - pc
            }
            LOOKUPSWITCH => {
                let operands = switch_operands_start(pc);
                let pairs = read_i32(code, operands + 4, pc)?;
                if pairs < 0 {
                    return Err(BytecodeError::InvalidSwitch { offset: pc });
                }
                let pairs = pairs as usize;
                branches = branches.saturating_add(pairs as u32);
                operands + 8 + pairs * 8 - pc
            }
            WIDE => match code.get(pc + 1) {
                Some(&IINC) => 6,
                Some(_) => 4,
                None => return Err(BytecodeError::Truncated { offset: pc }),
            },
            _ => {
                if is_conditional_branch(opcode) {
                    branches += 1;
                }
                fixed_length(opcode).ok_or(BytecodeError::UnknownOpcode { opcode, offset: pc })?
            }
        };

        if pc + length > code.len() {
            return Err(BytecodeError::Truncated { offset: pc });
        }
        pc += length;
    }

    Ok(branches)
}

/// Complexity of one method: branch points, plus one per exception handler, plus one.
pub fn method_complexity(method: &MethodDescriptor) -> Result<u32, BytecodeError> {
    let branches = match (method.branch_count, method.code.as_deref()) {
        (Some(count), _) => count,
        (None, Some(code)) => count_branch_points(code)?,
        (None, None) => 0,
    };
    Ok(branches
        .saturating_add(method.handler_count)
        .saturating_add(1))
}

/// Complexity used when the method's code cannot be decoded.
pub fn fallback_complexity(method: &MethodDescriptor) -> u32 {
    method.handler_count.saturating_add(1)
}

/// Sum of method complexities. Undecodable methods contribute their fallback.
pub fn class_complexity(class: &ClassDescriptor) -> u32 {
    class
        .methods
        .iter()
        .map(|m| method_complexity(m).unwrap_or_else(|_| fallback_complexity(m)))
        .fold(0u32, u32::saturating_add)
}

fn is_conditional_branch(opcode: u8) -> bool {
    matches!(opcode, 0x99..=0xa6 | 0xc6 | 0xc7)
}

// Switch operands start on the next 4-byte boundary relative to the code start.
fn switch_operands_start(pc: usize) -> usize {
    (pc + 4) & !3
}

fn read_i32(code: &[u8], at: usize, offset: usize) -> Result<i32, BytecodeError> {
    code.get(at..at + 4)
        .map(|b| i32::from_be_bytes([b[0], b[1], b[2], b[3]]))
        .ok_or(BytecodeError::Truncated { offset })
}

/// Instruction length including the opcode, for fixed-size instructions.
fn fixed_length(opcode: u8) -> Option<usize> {
    Some(match opcode {
        0x00..=0x0f => 1,
        0x10 => 2,
        0x11 => 3,
        0x12 => 2,
        0x13 | 0x14 => 3,
        0x15..=0x19 => 2,
        0x1a..=0x35 => 1,
        0x36..=0x3a => 2,
        0x3b..=0x83 => 1,
        IINC => 3,
        0x85..=0x98 => 1,
        0x99..=0xa8 => 3,
        0xa9 => 2,
        0xac..=0xb1 => 1,
        0xb2..=0xb8 => 3,
        0xb9 | 0xba => 5,
        0xbb => 3,
        0xbc => 2,
        0xbd => 3,
        0xbe | 0xbf => 1,
        0xc0 | 0xc1 => 3,
        0xc2 | 0xc3 => 1,
        0xc5 => 4,
        0xc6 | 0xc7 => 3,
        0xc8 | 0xc9 => 5,
        0xca | 0xfe | 0xff => 1,
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    // if (x == 0) { ... } as `iload_1; ifne +5; iconst_0; ireturn; iconst_1; ireturn`
    const SINGLE_IF: [u8; 7] = [0x1b, 0x9a, 0x00, 0x05, 0x03, 0xac, 0x04];

    #[test]
    fn test_counts_conditional_branches() {
        let mut code = SINGLE_IF.to_vec();
        code.push(0xac);
        assert_eq!(count_branch_points(&code), Ok(1));
    }

    #[test]
    fn test_goto_is_not_a_branch_point() {
        // goto +3; return
        let code = [0xa7, 0x00, 0x03, 0xb1];
        assert_eq!(count_branch_points(&code), Ok(0));
    }

    #[test]
    fn test_null_checks_count() {
        // aload_0; ifnull +4; aload_0; ifnonnull +4; return
        let code = [0x2a, 0xc6, 0x00, 0x04, 0x2a, 0xc7, 0x00, 0x04, 0xb1];
        assert_eq!(count_branch_points(&code), Ok(2));
    }

    #[test]
    fn test_tableswitch_counts_cases_with_padding() {
        // iload_1 at 0, tableswitch at 1, operands aligned to 4
        let mut code = vec![0x1b, 0xaa, 0x00, 0x00];
        code.extend_from_slice(&20i32.to_be_bytes()); // default
        code.extend_from_slice(&1i32.to_be_bytes()); // low
        code.extend_from_slice(&3i32.to_be_bytes()); // high
        for offset in [10i32, 12, 14] {
            code.extend_from_slice(&offset.to_be_bytes());
        }
        code.push(0xb1);
        assert_eq!(count_branch_points(&code), Ok(3));
    }

    #[test]
    fn test_lookupswitch_counts_pairs() {
        // lookupswitch at 0, three padding bytes
        let mut code = vec![0xab, 0x00, 0x00, 0x00];
        code.extend_from_slice(&20i32.to_be_bytes()); // default
        code.extend_from_slice(&2i32.to_be_bytes()); // npairs
        for (key, offset) in [(7i32, 10i32), (42, 12)] {
            code.extend_from_slice(&key.to_be_bytes());
            code.extend_from_slice(&offset.to_be_bytes());
        }
        code.push(0xb1);
        assert_eq!(count_branch_points(&code), Ok(2));
    }

    #[test]
    fn test_wide_instructions() {
        // wide iload 0x0100; wide iinc 0x0100 by 1; ifeq +3; return
        let code = [
            0xc4, 0x15, 0x01, 0x00, 0xc4, 0x84, 0x01, 0x00, 0x00, 0x01, 0x99, 0x00, 0x03, 0xb1,
        ];
        assert_eq!(count_branch_points(&code), Ok(1));
    }

    #[test]
    fn test_truncated_and_unknown_code() {
        assert_eq!(
            count_branch_points(&[0x99, 0x00]),
            Err(BytecodeError::Truncated { offset: 0 })
        );
        assert_eq!(
            count_branch_points(&[0x00, 0xcb]),
            Err(BytecodeError::UnknownOpcode {
                opcode: 0xcb,
                offset: 1
            })
        );
    }

    #[test]
    fn test_inverted_tableswitch_is_rejected() {
        let mut code = vec![0xaa, 0x00, 0x00, 0x00];
        code.extend_from_slice(&0i32.to_be_bytes());
        code.extend_from_slice(&5i32.to_be_bytes());
        code.extend_from_slice(&1i32.to_be_bytes());
        assert_eq!(
            count_branch_points(&code),
            Err(BytecodeError::InvalidSwitch { offset: 0 })
        );
    }

    #[test]
    fn test_five_branches_and_one_handler() {
        let mut method = MethodDescriptor::new("process");
        method.branch_count = Some(5);
        method.handler_count = 1;
        assert_eq!(method_complexity(&method), Ok(7));
    }

    #[test]
    fn test_precomputed_count_wins_over_code() {
        let mut method = MethodDescriptor::new("process");
        method.branch_count = Some(2);
        method.code = Some(vec![0xff, 0xcb]);
        assert_eq!(method_complexity(&method), Ok(3));
    }

    #[test]
    fn test_class_complexity_sums_methods() {
        let mut class = ClassDescriptor::new("com.acme.Service");
        let mut decoded = MethodDescriptor::new("a");
        decoded.code = Some(SINGLE_IF.iter().copied().chain([0xac]).collect());
        let mut broken = MethodDescriptor::new("b");
        broken.code = Some(vec![0x99]);
        broken.handler_count = 2;
        class.methods = vec![decoded, broken, MethodDescriptor::new("c")];

        // 2 + (2 + 1) + 1
        assert_eq!(class_complexity(&class), 6);
    }
}
