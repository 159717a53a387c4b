//! Scripted [`BitTransport`] for tests.

use std::collections::VecDeque;

use super::{BitTransport, DebugProbeError};

/// One expected call on the transport, with the reply to give.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum BitOp {
    RawOut(Vec<u8>, usize),
    WriteCmd { request: u8, ack: u8 },
    WriteWord(u32, bool),
    ReadWord(u32, bool),
    Flush,
    Reset(bool),
}

/// A [`BitTransport`] which checks every call against a queue of expectations.
///
/// Dropping the mock with expectations left fails the test.
#[derive(Debug, Default)]
pub(crate) struct MockBitTransport {
    expected: VecDeque<BitOp>,
}

impl MockBitTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn expect(&mut self, op: BitOp) -> &mut Self {
        self.expected.push_back(op);
        self
    }

    /// Move all expectations of `other` to the end of this queue.
    pub fn append(&mut self, other: &mut MockBitTransport) {
        self.expected.append(&mut other.expected);
    }

    fn next(&mut self, call: &str) -> BitOp {
        match self.expected.pop_front() {
            Some(op) => op,
            None => panic!("unexpected call to {call}, no more calls expected"),
        }
    }
}

impl BitTransport for MockBitTransport {
    fn raw_out(&mut self, bits: &[u8], bit_len: usize) -> Result<(), DebugProbeError> {
        match self.next("raw_out") {
            BitOp::RawOut(expected, expected_len) => {
                assert_eq!(bits, &expected[..]);
                assert_eq!(bit_len, expected_len);
                Ok(())
            }
            other => panic!("raw_out({bits:02x?}, {bit_len}) called, expected {other:x?}"),
        }
    }

    fn write_cmd(&mut self, request: u8) -> Result<u8, DebugProbeError> {
        match self.next("write_cmd") {
            BitOp::WriteCmd {
                request: expected,
                ack,
            } => {
                assert_eq!(
                    request, expected,
                    "request {request:#04x}, expected {expected:#04x}"
                );
                Ok(ack)
            }
            other => panic!("write_cmd({request:#04x}) called, expected {other:x?}"),
        }
    }

    fn write_word_and_parity(&mut self, word: u32, parity: bool) -> Result<(), DebugProbeError> {
        match self.next("write_word_and_parity") {
            BitOp::WriteWord(expected, expected_parity) => {
                assert_eq!(word, expected, "word {word:#010x}, expected {expected:#010x}");
                assert_eq!(parity, expected_parity);
                Ok(())
            }
            other => panic!("write_word_and_parity({word:#010x}) called, expected {other:x?}"),
        }
    }

    fn read_word_and_parity(&mut self) -> Result<(u32, bool), DebugProbeError> {
        match self.next("read_word_and_parity") {
            BitOp::ReadWord(word, parity) => Ok((word, parity)),
            other => panic!("read_word_and_parity called, expected {other:x?}"),
        }
    }

    fn flush(&mut self) -> Result<(), DebugProbeError> {
        match self.next("flush") {
            BitOp::Flush => Ok(()),
            other => panic!("flush called, expected {other:x?}"),
        }
    }

    fn reset_target(&mut self, assert: bool) -> Result<(), DebugProbeError> {
        match self.next("reset_target") {
            BitOp::Reset(expected) => {
                assert_eq!(assert, expected);
                Ok(())
            }
            other => panic!("reset_target({assert}) called, expected {other:x?}"),
        }
    }
}

impl Drop for MockBitTransport {
    fn drop(&mut self) {
        if !std::thread::panicking() {
            assert!(
                self.expected.is_empty(),
                "expected calls were not made: {:x?}",
                self.expected
            );
        }
    }
}
