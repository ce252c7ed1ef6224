//! Guest-facing return codes and host-side error types.
//!
//! Every host function returns `i64`: non-negative values are successful
//! results (byte counts, slot numbers, packed offsets, valid floats) and
//! negative values come from the closed `HookReturnCode` set. The repr
//! values are wire-stable and must not change.

use std::fmt;

/// Return codes shared by every host function.
///
/// Codes are returned to the guest verbatim; the guest decides whether to
/// continue or to call `rollback`. `RcRollback` and `RcAccept` are the
/// terminal codes recorded when the guest ends its own execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i64)]
pub enum HookReturnCode {
    Success = 0,
    OutOfBounds = -1,
    InternalError = -2,
    TooBig = -3,
    TooSmall = -4,
    DoesntExist = -5,
    NoFreeSlots = -6,
    InvalidArgument = -7,
    AlreadySet = -8,
    PrerequisiteNotMet = -9,
    FeeTooLarge = -10,
    EmissionFailure = -11,
    TooManyNonces = -12,
    TooManyEmittedTxn = -13,
    NotImplemented = -14,
    InvalidAccount = -15,
    GuardViolation = -16,
    InvalidField = -17,
    ParseError = -18,
    RcRollback = -19,
    RcAccept = -20,
    NoSuchKeylet = -21,
    NotAnArray = -22,
    NotAnObject = -23,
    DivisionByZero = -25,
    MantissaOversized = -26,
    MantissaUndersized = -27,
    ExponentOversized = -28,
    ExponentUndersized = -29,
    Overflow = -30,
    NotIouAmount = -31,
    NotAnAmount = -32,
    CantReturnNegative = -33,
    NotAuthorized = -34,
    PreviousFailurePreventsRetry = -35,
    TooManyParams = -36,
    /// Chosen so it can never collide with a valid float encoding.
    InvalidFloat = -10024,
}

impl HookReturnCode {
    /// The `i64` value returned to the guest.
    pub fn as_i64(self) -> i64 {
        self as i64
    }

    /// Decode a guest-facing return code.
    pub fn from_i64(v: i64) -> Option<Self> {
        use HookReturnCode::*;
        Some(match v {
            0 => Success,
            -1 => OutOfBounds,
            -2 => InternalError,
            -3 => TooBig,
            -4 => TooSmall,
            -5 => DoesntExist,
            -6 => NoFreeSlots,
            -7 => InvalidArgument,
            -8 => AlreadySet,
            -9 => PrerequisiteNotMet,
            -10 => FeeTooLarge,
            -11 => EmissionFailure,
            -12 => TooManyNonces,
            -13 => TooManyEmittedTxn,
            -14 => NotImplemented,
            -15 => InvalidAccount,
            -16 => GuardViolation,
            -17 => InvalidField,
            -18 => ParseError,
            -19 => RcRollback,
            -20 => RcAccept,
            -21 => NoSuchKeylet,
            -22 => NotAnArray,
            -23 => NotAnObject,
            -25 => DivisionByZero,
            -26 => MantissaOversized,
            -27 => MantissaUndersized,
            -28 => ExponentOversized,
            -29 => ExponentUndersized,
            -30 => Overflow,
            -31 => NotIouAmount,
            -32 => NotAnAmount,
            -33 => CantReturnNegative,
            -34 => NotAuthorized,
            -35 => PreviousFailurePreventsRetry,
            -36 => TooManyParams,
            -10024 => InvalidFloat,
            _ => return None,
        })
    }
}

impl fmt::Display for HookReturnCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use HookReturnCode::*;
        let s = match self {
            Success => "SUCCESS",
            OutOfBounds => "OUT_OF_BOUNDS",
            InternalError => "INTERNAL_ERROR",
            TooBig => "TOO_BIG",
            TooSmall => "TOO_SMALL",
            DoesntExist => "DOESNT_EXIST",
            NoFreeSlots => "NO_FREE_SLOTS",
            InvalidArgument => "INVALID_ARGUMENT",
            AlreadySet => "ALREADY_SET",
            PrerequisiteNotMet => "PREREQUISITE_NOT_MET",
            FeeTooLarge => "FEE_TOO_LARGE",
            EmissionFailure => "EMISSION_FAILURE",
            TooManyNonces => "TOO_MANY_NONCES",
            TooManyEmittedTxn => "TOO_MANY_EMITTED_TXN",
            NotImplemented => "NOT_IMPLEMENTED",
            InvalidAccount => "INVALID_ACCOUNT",
            GuardViolation => "GUARD_VIOLATION",
            InvalidField => "INVALID_FIELD",
            ParseError => "PARSE_ERROR",
            RcRollback => "RC_ROLLBACK",
            RcAccept => "RC_ACCEPT",
            NoSuchKeylet => "NO_SUCH_KEYLET",
            NotAnArray => "NOT_AN_ARRAY",
            NotAnObject => "NOT_AN_OBJECT",
            DivisionByZero => "DIVISION_BY_ZERO",
            MantissaOversized => "MANTISSA_OVERSIZED",
            MantissaUndersized => "MANTISSA_UNDERSIZED",
            ExponentOversized => "EXPONENT_OVERSIZED",
            ExponentUndersized => "EXPONENT_UNDERSIZED",
            Overflow => "OVERFLOW",
            NotIouAmount => "NOT_IOU_AMOUNT",
            NotAnAmount => "NOT_AN_AMOUNT",
            CantReturnNegative => "CANT_RETURN_NEGATIVE",
            NotAuthorized => "NOT_AUTHORIZED",
            PreviousFailurePreventsRetry => "PREVIOUS_FAILURE_PREVENTS_RETRY",
            TooManyParams => "TOO_MANY_PARAMS",
            InvalidFloat => "INVALID_FLOAT",
        };
        f.write_str(s)
    }
}

/// How a hook execution ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum ExitType {
    /// Execution has not produced an exit yet.
    #[default]
    Unset = 0,
    /// The engine trapped outside of a deliberate accept/rollback.
    WasmError = 1,
    /// The hook vetoed the transaction (or hit a guard violation).
    Rollback = 2,
    /// The hook accepted the transaction.
    Accept = 3,
}

/// Install-time log codes. Each hook install log line carries one:
/// `HookSet(<code>)[<account>]: <message>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum HookSetCode {
    ShortHook = 0,
    CallIllegal = 1,
    GuardParameters = 2,
    CallIndirect = 3,
    GuardMissing = 4,
    MemoryGrow = 5,
    BlockIllegal = 6,
    InstructionCount = 7,
    InstructionExcess = 8,
    ParametersIllegal = 9,
    ParametersField = 10,
    ParametersName = 11,
    HashOrCode = 12,
    GrantsEmpty = 13,
    GrantsExcess = 14,
    GrantsIllegal = 15,
    GrantsField = 16,
    ApiIllegal = 17,
    NamespaceMissing = 18,
    ApiMissing = 19,
    ApiInvalid = 20,
    HookOnMissing = 21,
    DeleteField = 22,
    OverrideMissing = 23,
    FlagsInvalid = 24,
    NsDeleteField = 25,
    NsDeleteFlags = 26,
}

impl HookSetCode {
    /// Numeric value carried in the log line.
    pub fn as_u16(self) -> u16 {
        self as u16
    }
}

impl fmt::Display for HookSetCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u16())
    }
}

/// Host-side error type used by the per-execution services.
///
/// Guests see the `i64` code via [`to_return_code`](HookError::to_return_code).
/// The `Internal` variant keeps a descriptive message for host-side logs but
/// surfaces as `INTERNAL_ERROR` to the guest.
#[derive(Debug, Clone, thiserror::Error)]
pub enum HookError {
    /// A code from the closed guest-facing set.
    #[error("hook error: {0}")]
    Code(HookReturnCode),
    /// Host-only failure, surfaced to the guest as `INTERNAL_ERROR`.
    #[error("internal hook error: {0}")]
    Internal(String),
}

impl HookError {
    /// The `i64` code returned to the guest for this error.
    pub fn to_return_code(&self) -> i64 {
        match self {
            Self::Code(code) => code.as_i64(),
            Self::Internal(_) => HookReturnCode::InternalError.as_i64(),
        }
    }
}

impl From<HookReturnCode> for HookError {
    fn from(code: HookReturnCode) -> Self {
        Self::Code(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repr_values_are_wire_stable() {
        assert_eq!(HookReturnCode::Success.as_i64(), 0);
        assert_eq!(HookReturnCode::OutOfBounds.as_i64(), -1);
        assert_eq!(HookReturnCode::NoFreeSlots.as_i64(), -6);
        assert_eq!(HookReturnCode::GuardViolation.as_i64(), -16);
        assert_eq!(HookReturnCode::RcRollback.as_i64(), -19);
        assert_eq!(HookReturnCode::RcAccept.as_i64(), -20);
        assert_eq!(HookReturnCode::TooManyParams.as_i64(), -36);
        assert_eq!(HookReturnCode::InvalidFloat.as_i64(), -10024);
    }

    #[test]
    fn test_from_i64_roundtrip() {
        for v in -36..=0 {
            if let Some(code) = HookReturnCode::from_i64(v) {
                assert_eq!(code.as_i64(), v);
            }
        }
        assert_eq!(
            HookReturnCode::from_i64(-10024),
            Some(HookReturnCode::InvalidFloat)
        );
    }

    #[test]
    fn test_from_i64_unknown() {
        assert_eq!(HookReturnCode::from_i64(-24), None); // gap left by INVALID_FLOAT
        assert_eq!(HookReturnCode::from_i64(-37), None);
        assert_eq!(HookReturnCode::from_i64(1), None);
    }

    #[test]
    fn test_hookset_code_values() {
        assert_eq!(HookSetCode::ShortHook.as_u16(), 0);
        assert_eq!(HookSetCode::InstructionExcess.as_u16(), 8);
        assert_eq!(HookSetCode::ParametersIllegal.as_u16(), 9);
        assert_eq!(HookSetCode::NsDeleteFlags.as_u16(), 26);
    }

    #[test]
    fn test_internal_maps_to_internal_error() {
        let err = HookError::Internal("directory corrupt".into());
        assert_eq!(err.to_return_code(), -2);
    }

    #[test]
    fn test_exit_type_default() {
        assert_eq!(ExitType::default(), ExitType::Unset);
    }
}
