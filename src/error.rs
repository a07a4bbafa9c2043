use core::fmt;

/// Platform error code, `esp_err_t` on ESP-IDF.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct EspErr(pub i32);

impl EspErr {
    pub const OK: Self = Self(0);
    pub const FAIL: Self = Self(-1);

    pub const ERR_NO_MEM: Self = Self(0x101);
    pub const ERR_INVALID_ARG: Self = Self(0x102);
    pub const ERR_INVALID_STATE: Self = Self(0x103);
    pub const ERR_INVALID_SIZE: Self = Self(0x104);
    pub const ERR_NOT_FOUND: Self = Self(0x105);
    pub const ERR_NOT_SUPPORTED: Self = Self(0x106);
    pub const ERR_TIMEOUT: Self = Self(0x107);
    pub const ERR_INVALID_RESPONSE: Self = Self(0x108);
    pub const ERR_INVALID_CRC: Self = Self(0x109);
    pub const ERR_INVALID_VERSION: Self = Self(0x10A);
    pub const ERR_INVALID_MAC: Self = Self(0x10B);
    pub const ERR_NOT_FINISHED: Self = Self(0x10C);
    pub const ERR_NOT_ALLOWED: Self = Self(0x10D);

    pub const fn code(self) -> i32 {
        self.0
    }

    pub const fn is_ok(self) -> bool {
        self.0 == Self::OK.0
    }

    /// Symbolic name of the code, `esp_err_to_name` equivalent.
    pub const fn name(self) -> &'static str {
        match self.0 {
            0 => "ESP_OK",
            -1 => "ESP_FAIL",
            0x101 => "ESP_ERR_NO_MEM",
            0x102 => "ESP_ERR_INVALID_ARG",
            0x103 => "ESP_ERR_INVALID_STATE",
            0x104 => "ESP_ERR_INVALID_SIZE",
            0x105 => "ESP_ERR_NOT_FOUND",
            0x106 => "ESP_ERR_NOT_SUPPORTED",
            0x107 => "ESP_ERR_TIMEOUT",
            0x108 => "ESP_ERR_INVALID_RESPONSE",
            0x109 => "ESP_ERR_INVALID_CRC",
            0x10A => "ESP_ERR_INVALID_VERSION",
            0x10B => "ESP_ERR_INVALID_MAC",
            0x10C => "ESP_ERR_NOT_FINISHED",
            0x10D => "ESP_ERR_NOT_ALLOWED",
            _ => "UNKNOWN ERROR",
        }
    }

    pub fn into_result(self) -> Result<(), EspErr> {
        if self.is_ok() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl From<i32> for EspErr {
    fn from(value: i32) -> Self {
        Self(value)
    }
}

impl From<EspErr> for i32 {
    fn from(value: EspErr) -> Self {
        value.0
    }
}

impl From<Result<(), EspErr>> for EspErr {
    fn from(value: Result<(), EspErr>) -> Self {
        match value {
            Ok(()) => Self::OK,
            Err(e) => e,
        }
    }
}

impl fmt::Debug for EspErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(0x{:x})", self.name(), self.0)
    }
}

impl fmt::Display for EspErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_known_codes() {
        assert_eq!(EspErr::OK.name(), "ESP_OK");
        assert_eq!(EspErr::FAIL.name(), "ESP_FAIL");
        assert_eq!(EspErr::from(0x102).name(), "ESP_ERR_INVALID_ARG");
        assert_eq!(EspErr::ERR_NOT_ALLOWED.name(), "ESP_ERR_NOT_ALLOWED");
    }

    #[test]
    fn unknown_code() {
        assert_eq!(EspErr(0x7777).name(), "UNKNOWN ERROR");
        assert!(!EspErr(0x7777).is_ok());
    }

    #[test]
    fn result_conversion() {
        assert_eq!(EspErr::OK.into_result(), Ok(()));
        assert_eq!(EspErr::ERR_TIMEOUT.into_result(), Err(EspErr::ERR_TIMEOUT));
        assert_eq!(EspErr::from(Err(EspErr::ERR_NO_MEM)), EspErr::ERR_NO_MEM);
        assert_eq!(i32::from(EspErr::ERR_NO_MEM), 0x101);
    }
}
