// Copyright 2022 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Wire types for the VFS broker protocol (§6): the envelope, opcodes and
//! reply shapes are an external contract this driver speaks but does not
//! define; this crate models that contract the way `uart-interface` models
//! the CAmkES RPC surface `uart-driver` speaks.

#![cfg_attr(not(test), no_std)]

use num_enum::{FromPrimitive, IntoPrimitive};
use serde::{Deserialize, Serialize};

/// A global file descriptor minted by the broker at open time. Opaque to
/// the driver; `0` never names an open descriptor.
pub type GlobalFd = u32;

#[repr(u8)]
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, FromPrimitive, IntoPrimitive)]
pub enum Opcode {
    Open = 0,
    Read,
    Write,
    Close,
    #[default]
    Other,
}

/// Coarse success/failure carried on the wire, per §4.7.
#[repr(u8)]
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub enum ResultCode {
    #[default]
    Success,
    Failure,
}
impl ResultCode {
    pub fn from_bool(ok: bool) -> Self {
        if ok {
            Self::Success
        } else {
            Self::Failure
        }
    }
}

/// Errors internal to the driver. Never placed on the wire directly; every
/// opcode handler collapses these to a [`ResultCode`] before replying
/// (§7 taxonomy item 1/2).
#[repr(usize)]
#[derive(Debug, Default, Eq, PartialEq, FromPrimitive, IntoPrimitive)]
pub enum Ns16550Error {
    Success = 0,
    SerializeFailed,
    DeserializeFailed,
    BadPath,
    BadDescriptor,
    AlreadyOpen,
    NotOpen,
    BadLimit,
    NoReplyBuffer,
    #[default]
    UnknownError,
}
impl From<Ns16550Error> for Result<(), Ns16550Error> {
    fn from(err: Ns16550Error) -> Result<(), Ns16550Error> {
        if err == Ns16550Error::Success {
            Ok(())
        } else {
            Err(err)
        }
    }
}

/// The readable/writable bits the broker must be told about (§3, §4.7).
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ReadyMask(u8);

impl ReadyMask {
    pub const NONE: Self = Self(0);
    pub const READ: Self = Self(0b01);
    pub const WRITE: Self = Self(0b10);

    pub fn is_readable(self) -> bool { self.0 & Self::READ.0 != 0 }
    pub fn is_writable(self) -> bool { self.0 & Self::WRITE.0 != 0 }

    pub fn with_read(self, set: bool) -> Self { self.set_bit(Self::READ.0, set) }
    pub fn with_write(self, set: bool) -> Self { self.set_bit(Self::WRITE.0, set) }

    fn set_bit(self, bit: u8, set: bool) -> Self {
        if set {
            Self(self.0 | bit)
        } else {
            Self(self.0 & !bit)
        }
    }

    /// Bits that are set in `self` but were not set in `previous` — the
    /// 0->1 transitions a `VfsReady` notice must announce (§4.7).
    pub fn rising_edges(self, previous: Self) -> Self { Self(self.0 & !previous.0) }

    pub fn is_empty(self) -> bool { self.0 == 0 }

    pub fn as_u8(self) -> u8 { self.0 }
}
impl From<u8> for ReadyMask {
    fn from(bits: u8) -> Self { Self(bits & (Self::READ.0 | Self::WRITE.0)) }
}
impl core::ops::BitOr for ReadyMask {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self { Self(self.0 | rhs.0) }
}
// serde impls kept separate from the bit-twiddling API above so the wire
// representation (a plain u8) stays decoupled from the in-memory one.
impl Serialize for ReadyMask {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.0)
    }
}
impl<'de> Deserialize<'de> for ReadyMask {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(ReadyMask::from(u8::deserialize(deserializer)?))
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OpenRequest<'a> {
    pub path: &'a str,
}
#[derive(Debug, Serialize, Deserialize)]
pub struct OpenReply {
    pub result: ResultCode,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReadRequest {
    pub gfd: GlobalFd,
    /// Accepted but ignored; serial ports are not seekable (§1 Non-goals).
    pub offset: u64,
    pub size: usize,
}
#[derive(Debug, Serialize, Deserialize)]
pub struct ReadReply<'a> {
    pub result: ResultCode,
    pub ready: ReadyMask,
    pub data: &'a [u8],
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WriteRequest<'a> {
    pub gfd: GlobalFd,
    pub offset: u64,
    pub data: &'a [u8],
}
#[derive(Debug, Serialize, Deserialize)]
pub struct WriteReply {
    pub result: ResultCode,
    pub ready: ReadyMask,
    pub num_written: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CloseRequest {
    pub gfd: GlobalFd,
}
#[derive(Debug, Serialize, Deserialize)]
pub struct CloseReply {
    pub result: ResultCode,
}

/// Unsolicited readiness-edge notice (§4.7, §8 "edge-only notifications").
#[derive(Debug, Serialize, Deserialize)]
pub struct VfsReady<'a> {
    pub path: &'a str,
    pub ready: ReadyMask,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rising_edges_only_new_bits() {
        let prev = ReadyMask::NONE;
        let now = ReadyMask::NONE.with_read(true);
        assert!(now.rising_edges(prev).is_readable());

        // Once already reported, staying set is not a new edge.
        assert!(!now.rising_edges(now).is_readable());
    }

    #[test]
    fn write_bit_independent_of_read_bit() {
        let mask = ReadyMask::NONE.with_read(true).with_write(true);
        assert!(mask.is_readable());
        assert!(mask.is_writable());
        let read_only = mask.with_write(false);
        assert!(read_only.is_readable());
        assert!(!read_only.is_writable());
    }

    #[test]
    fn result_code_from_bool() {
        assert_eq!(ResultCode::Success, ResultCode::from_bool(true));
        assert_eq!(ResultCode::Failure, ResultCode::from_bool(false));
    }
}
