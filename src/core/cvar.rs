//! Console variable (cvar) implementation.
//!
//! A [`CVar`] is a named, typed value with behavior flags. The value is a
//! tagged [`CVarValue`] rather than one type per variable kind, so parsing,
//! formatting and comparison are a single exhaustive match.

use std::fmt;
use std::sync::Arc;

use bitflags::bitflags;

bitflags! {
    /// Flags controlling cvar and command behavior.
    ///
    /// Bit values follow the classic `VF_*` layout so flag masks read the same
    /// in dumps and logs.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct CVarFlags: u32 {
        /// Stays at its default unless the process runs in dev or editor mode.
        const CHEAT = 0x0000_0002;
        /// Cannot be changed by the user.
        const READONLY = 0x0000_0008;
        /// Changing the value only takes effect after a level reload.
        const REQUIRE_LEVEL_RELOAD = 0x0000_0010;
        /// Changing the value only takes effect after an application restart.
        const REQUIRE_APP_RESTART = 0x0000_0020;
        /// Set whenever the value changes after registration.
        const MODIFIED = 0x0000_0100;
        /// The current value came from a loaded configuration.
        const WASINCONFIG = 0x0000_0200;
        /// Integer value may be entered as letters (`a`-`z`, `A`-`Z`).
        const BITFIELD = 0x0000_0400;
        /// Reachable from interactive input while restricted mode is on.
        const RESTRICTEDMODE = 0x0000_0800;
        /// Value is never shown.
        const INVISIBLE = 0x0000_1000;
        /// Stops the deferred queue for the rest of the frame once executed.
        const BLOCKFRAME = 0x0000_4000;
        /// Registered as non-modifiable.
        const CONST = 0x0000_8000;
        /// Cheat variable that is always part of the cheat hash.
        const CHEAT_ALWAYS_CHECK = 0x0001_0000;
        /// Cheat variable that is never part of the cheat hash.
        const CHEAT_NOCHECK = 0x0002_0000;
        /// Written to the saved variable file.
        const DUMPTODISK = 0x0010_0000;
        /// Kept for compatibility; changes are always refused.
        const DEPRECATED = 0x0040_0000;
    }
}

impl CVarFlags {
    /// Every flag that marks an entry as cheat-protected.
    pub const CHEAT_MASK: Self = Self::CHEAT
        .union(Self::CHEAT_NOCHECK)
        .union(Self::CHEAT_ALWAYS_CHECK);

    /// True if any cheat flag is set.
    #[inline]
    pub fn is_cheat(self) -> bool {
        self.intersects(Self::CHEAT_MASK)
    }
}

/// Render the user-visible subset of `flags` the way listings and dumps show it.
///
/// CHEAT and CONST are never shown.
pub fn flags_string(flags: CVarFlags) -> String {
    const SHOWN: [(CVarFlags, &str); 6] = [
        (CVarFlags::READONLY, "READONLY"),
        (CVarFlags::DEPRECATED, "DEPRECATED"),
        (CVarFlags::DUMPTODISK, "DUMPTODISK"),
        (CVarFlags::REQUIRE_LEVEL_RELOAD, "REQUIRE_LEVEL_RELOAD"),
        (CVarFlags::REQUIRE_APP_RESTART, "REQUIRE_APP_RESTART"),
        (CVarFlags::RESTRICTEDMODE, "RESTRICTEDMODE"),
    ];

    SHOWN
        .iter()
        .filter(|(flag, _)| flags.contains(*flag))
        .map(|(_, name)| *name)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Type tag of a cvar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CVarType {
    Int,
    Float,
    String,
    Int64,
}

impl CVarType {
    /// Name used in dumps and duplicate-registration messages.
    pub fn name(self) -> &'static str {
        match self {
            CVarType::Int => "int",
            CVarType::Float => "float",
            CVarType::String => "string",
            CVarType::Int64 => "int64",
        }
    }
}

impl fmt::Display for CVarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A cvar value.
#[derive(Debug, Clone, PartialEq)]
pub enum CVarValue {
    Int(i32),
    Float(f32),
    String(String),
    Int64(i64),
}

impl CVarValue {
    /// The type tag of this value.
    pub fn ty(&self) -> CVarType {
        match self {
            CVarValue::Int(_) => CVarType::Int,
            CVarValue::Float(_) => CVarType::Float,
            CVarValue::String(_) => CVarType::String,
            CVarValue::Int64(_) => CVarType::Int64,
        }
    }

    /// Parse `text` into a value of type `ty`.
    ///
    /// Numeric parsing is lenient: the longest numeric prefix is used and
    /// anything unparseable yields zero. Bitfield integers also accept letters
    /// and `+`/`-` prefixes to set or clear bits relative to `current`.
    pub fn parse(ty: CVarType, text: &str, bitfield: bool, current: &CVarValue) -> CVarValue {
        match ty {
            CVarType::Int => {
                CVarValue::Int(text_to_int(text, current.as_i64(), bitfield) as i32)
            }
            CVarType::Int64 => CVarValue::Int64(text_to_int(text, current.as_i64(), bitfield)),
            CVarType::Float => CVarValue::Float(leading_f64(text.trim()).unwrap_or(0.0) as f32),
            CVarType::String => CVarValue::String(text.to_string()),
        }
    }

    /// Convert to `ty`, going through the string form for strings.
    pub fn convert(&self, ty: CVarType, bitfield: bool) -> CVarValue {
        match (ty, self) {
            (CVarType::Int, _) => CVarValue::Int(self.as_i64() as i32),
            (CVarType::Int64, _) => CVarValue::Int64(self.as_i64()),
            (CVarType::Float, _) => CVarValue::Float(self.as_f32()),
            (CVarType::String, CVarValue::String(s)) => CVarValue::String(s.clone()),
            (CVarType::String, other) => {
                CVarValue::parse(CVarType::String, &other.to_string(), bitfield, other)
            }
        }
    }

    fn as_i64(&self) -> i64 {
        match self {
            CVarValue::Int(v) => *v as i64,
            CVarValue::Int64(v) => *v,
            CVarValue::Float(v) => *v as i64,
            CVarValue::String(s) => text_to_int(s, 0, false),
        }
    }

    fn as_f32(&self) -> f32 {
        match self {
            CVarValue::Int(v) => *v as f32,
            CVarValue::Int64(v) => *v as f32,
            CVarValue::Float(v) => *v,
            CVarValue::String(s) => leading_f64(s.trim()).unwrap_or(0.0) as f32,
        }
    }
}

impl fmt::Display for CVarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CVarValue::Int(v) => write!(f, "{}", v),
            CVarValue::Int64(v) => write!(f, "{}", v),
            CVarValue::Float(v) => f.write_str(&format_g(*v, 6)),
            CVarValue::String(s) => f.write_str(s),
        }
    }
}

impl From<i32> for CVarValue {
    fn from(v: i32) -> Self {
        CVarValue::Int(v)
    }
}

impl From<i64> for CVarValue {
    fn from(v: i64) -> Self {
        CVarValue::Int64(v)
    }
}

impl From<f32> for CVarValue {
    fn from(v: f32) -> Self {
        CVarValue::Float(v)
    }
}

impl From<&str> for CVarValue {
    fn from(v: &str) -> Self {
        CVarValue::String(v.to_string())
    }
}

impl From<String> for CVarValue {
    fn from(v: String) -> Self {
        CVarValue::String(v)
    }
}

/// Callback invoked after a cvar value changed.
pub type OnChangeCallback = Arc<dyn Fn(&CVar) + Send + Sync>;

/// A console variable.
///
/// Built with a builder and handed to the registry:
///
/// ```ignore
/// let fov = CVar::new("r_fov", 60)
///     .help("Field of view in degrees")
///     .flags(CVarFlags::DUMPTODISK);
/// ```
pub struct CVar {
    name: String,
    value: CVarValue,
    default: CVarValue,
    flags: CVarFlags,
    help: String,
    on_change: Option<OnChangeCallback>,
    data_probe: Option<String>,
    allow_modify: bool,
}

impl CVar {
    /// Create a new cvar; its type is the type of `value`.
    pub fn new(name: impl Into<String>, value: impl Into<CVarValue>) -> Self {
        let value = value.into();
        Self {
            name: name.into(),
            default: value.clone(),
            value,
            flags: CVarFlags::empty(),
            help: String::new(),
            on_change: None,
            data_probe: None,
            allow_modify: true,
        }
    }

    /// Set the help text.
    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.help = help.into();
        self
    }

    /// Set the flags.
    pub fn flags(mut self, flags: CVarFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Set the change callback.
    pub fn on_change<F>(mut self, callback: F) -> Self
    where
        F: Fn(&CVar) + Send + Sync + 'static,
    {
        self.on_change = Some(Arc::new(callback));
        self
    }

    /// Registering with `allow_modify(false)` adds [`CVarFlags::CONST`].
    pub fn allow_modify(mut self, allow: bool) -> Self {
        self.allow_modify = allow;
        self
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn ty(&self) -> CVarType {
        self.value.ty()
    }

    #[inline]
    pub fn value(&self) -> &CVarValue {
        &self.value
    }

    #[inline]
    pub fn default_value(&self) -> &CVarValue {
        &self.default
    }

    #[inline]
    pub fn get_flags(&self) -> CVarFlags {
        self.flags
    }

    #[inline]
    pub fn get_help(&self) -> &str {
        &self.help
    }

    #[inline]
    pub fn is_const(&self) -> bool {
        self.flags.contains(CVarFlags::CONST)
    }

    pub fn get_i32(&self) -> i32 {
        self.value.as_i64() as i32
    }

    pub fn get_i64(&self) -> i64 {
        self.value.as_i64()
    }

    pub fn get_f32(&self) -> f32 {
        self.value.as_f32()
    }

    pub fn get_string(&self) -> String {
        self.value.to_string()
    }

    /// Parse `text` into this variable's type without storing it.
    pub fn parse_value(&self, text: &str) -> CVarValue {
        CVarValue::parse(
            self.ty(),
            text,
            self.flags.contains(CVarFlags::BITFIELD),
            &self.value,
        )
    }

    /// The value with the letter rendering of bitfield variables appended.
    pub fn display_value(&self) -> String {
        let mut text = self.get_string();
        if self.flags.contains(CVarFlags::BITFIELD) {
            let bits = self.get_i64() as u64;
            let alpha = bits & !63;
            let low = bits & 63;
            if alpha != 0 {
                text.push_str(" (");
                if low != 0 {
                    text.push_str(&format!("{}, ", low));
                }
                text.push_str(&bits_alpha64(alpha));
                text.push(')');
            }
        }
        text
    }

    /// The string fed to the cheat hash for this variable.
    pub fn data_probe_string(&self) -> String {
        if let Some(probe) = &self.data_probe {
            return probe.clone();
        }
        match &self.value {
            CVarValue::Float(v) => format_g(*v, 1),
            other => other.to_string(),
        }
    }

    /// Override the string fed to the cheat hash.
    pub fn set_data_probe_string(&mut self, probe: impl Into<String>) {
        self.data_probe = Some(probe.into());
    }

    pub(crate) fn on_change_callback(&self) -> Option<OnChangeCallback> {
        self.on_change.clone()
    }

    pub(crate) fn set_on_change(&mut self, callback: Option<OnChangeCallback>) {
        self.on_change = callback;
    }

    pub(crate) fn take_on_change(&mut self) -> Option<OnChangeCallback> {
        self.on_change.take()
    }

    pub(crate) fn allows_modify(&self) -> bool {
        self.allow_modify
    }

    pub(crate) fn set_flags(&mut self, flags: CVarFlags) {
        self.flags = flags;
    }

    /// Store a value of this variable's type. Returns the previous value.
    pub(crate) fn store(&mut self, value: CVarValue) -> CVarValue {
        let value = value.convert(self.ty(), self.flags.contains(CVarFlags::BITFIELD));
        std::mem::replace(&mut self.value, value)
    }

    /// Parse and store `text` without any gating or notification.
    ///
    /// Returns true if the value changed.
    pub fn set_from_str(&mut self, text: &str) -> bool {
        let value = self.parse_value(text);
        let changed = value != self.value;
        self.value = value;
        changed
    }

    /// Restore the registration-time default. Returns true if the value changed.
    pub fn reset(&mut self) -> bool {
        let changed = self.value != self.default;
        self.value = self.default.clone();
        changed
    }
}

impl fmt::Debug for CVar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CVar")
            .field("name", &self.name)
            .field("value", &self.value)
            .field("default", &self.default)
            .field("flags", &self.flags)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for CVar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.name, self.value)
    }
}

/// Letters for the bits 6..=31 (`a`..`z`) and 38..=63 (`A`..`Z`) of `bits`.
pub fn bits_alpha64(bits: u64) -> String {
    (0..64u32)
        .filter(|bit| bits & (1u64 << bit) != 0)
        .filter_map(|bit| match bit {
            6..=31 => Some((b'a' + (bit - 6) as u8) as char),
            38..=63 => Some((b'A' + (bit - 38) as u8) as char),
            _ => None,
        })
        .collect()
}

/// Bit mask for the letters in `text`; other characters are ignored.
pub fn alpha_bits64(text: &str) -> u64 {
    text.bytes().fold(0u64, |bits, c| match c {
        b'a'..=b'z' => bits | 1u64 << (c - b'a' + 6),
        b'A'..=b'Z' => bits | 1u64 << (c - b'A' + 38),
        _ => bits,
    })
}

fn text_to_int(text: &str, current: i64, bitfield: bool) -> i64 {
    let text = text.trim();
    if text.is_empty() {
        return 0;
    }

    if bitfield {
        let mut chars = text.chars();
        let sign = chars.next();
        let rest = chars.as_str();
        let starts_alpha = rest.chars().next().is_some_and(|c| c.is_ascii_alphabetic());
        match sign {
            Some('+') if starts_alpha => return current | alpha_bits64(rest) as i64,
            Some('-') if starts_alpha => return current & !(alpha_bits64(rest) as i64),
            _ => {}
        }
    }

    let (number, rest) = split_leading_number(text);
    let mut value = if number.contains(['.', 'e', 'E']) {
        number.parse::<f64>().map(|v| v as i64).unwrap_or(0)
    } else {
        number.parse::<i64>().unwrap_or(0)
    };
    if bitfield {
        value |= alpha_bits64(rest) as i64;
    }
    value
}

fn leading_f64(text: &str) -> Option<f64> {
    let (number, _) = split_leading_number(text);
    number.parse().ok()
}

/// Split `text` into its longest leading decimal number and the remainder.
fn split_leading_number(text: &str) -> (&str, &str) {
    let bytes = text.as_bytes();
    let mut end = 0;
    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        end = 1;
    }
    let digits_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    if end < bytes.len() && bytes[end] == b'.' {
        end += 1;
        while end < bytes.len() && bytes[end].is_ascii_digit() {
            end += 1;
        }
    }
    if end == digits_start || (end == digits_start + 1 && bytes[digits_start] == b'.') {
        return ("", text);
    }
    if end < bytes.len() && matches!(bytes[end], b'e' | b'E') {
        let mut exp_end = end + 1;
        if exp_end < bytes.len() && matches!(bytes[exp_end], b'+' | b'-') {
            exp_end += 1;
        }
        let exp_digits = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_digits {
            end = exp_end;
        }
    }
    text.split_at(end)
}

/// Format like C's `%.{precision}g`.
pub(crate) fn format_g(value: f32, precision: usize) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    if value == 0.0 {
        return "0".to_string();
    }

    let precision = precision.max(1);
    let value = value as f64;
    let scientific = format!("{:.*e}", precision - 1, value);
    let Some((mantissa, exponent)) = scientific.split_once('e') else {
        return scientific;
    };
    let exponent: i32 = exponent.parse().unwrap_or(0);

    if exponent < -4 || exponent >= precision as i32 {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", trim_fraction(mantissa), sign, exponent.abs())
    } else {
        let decimals = (precision as i32 - 1 - exponent).max(0) as usize;
        trim_fraction(&format!("{:.*}", decimals, value)).to_string()
    }
}

fn trim_fraction(text: &str) -> &str {
    if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.')
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_types() {
        assert_eq!(CVar::new("a", 1).ty(), CVarType::Int);
        assert_eq!(CVar::new("b", 1.5f32).ty(), CVarType::Float);
        assert_eq!(CVar::new("c", "x").ty(), CVarType::String);
        assert_eq!(CVar::new("d", 1i64).ty(), CVarType::Int64);
    }

    #[test]
    fn test_lenient_int_parsing() {
        let var = CVar::new("i", 5);
        assert_eq!(var.parse_value("42"), CVarValue::Int(42));
        assert_eq!(var.parse_value("3.7"), CVarValue::Int(3));
        assert_eq!(var.parse_value("12abc"), CVarValue::Int(12));
        assert_eq!(var.parse_value("abc"), CVarValue::Int(0));
        assert_eq!(var.parse_value("  -8 "), CVarValue::Int(-8));
    }

    #[test]
    fn test_empty_int_text_is_zero() {
        let var = CVar::new("i", 5);
        assert_eq!(var.parse_value(""), CVarValue::Int(0));
        assert_eq!(var.parse_value("   "), CVarValue::Int(0));

        let bits = CVar::new("b", 3i64).flags(CVarFlags::BITFIELD);
        assert_eq!(bits.parse_value(""), CVarValue::Int64(0));
    }

    #[test]
    fn test_lenient_float_parsing() {
        let var = CVar::new("f", 1.0f32);
        assert_eq!(var.parse_value("-9.8"), CVarValue::Float(-9.8));
        assert_eq!(var.parse_value("2"), CVarValue::Float(2.0));
        assert_eq!(var.parse_value("1e3"), CVarValue::Float(1000.0));
        assert_eq!(var.parse_value("nope"), CVarValue::Float(0.0));
    }

    #[test]
    fn test_float_formatting() {
        assert_eq!(CVarValue::Float(90.0).to_string(), "90");
        assert_eq!(CVarValue::Float(-9.8).to_string(), "-9.8");
        assert_eq!(CVarValue::Float(0.25).to_string(), "0.25");
        assert_eq!(CVarValue::Float(1234567.0).to_string(), "1.23457e+06");
        assert_eq!(CVarValue::Float(0.00001).to_string(), "1e-05");
    }

    #[test]
    fn test_data_probe_uses_short_float_form() {
        let var = CVar::new("g_gravity", -9.8f32);
        assert_eq!(var.data_probe_string(), "-1e+01");

        let var = CVar::new("half", 0.5f32);
        assert_eq!(var.data_probe_string(), "0.5");

        let mut var = CVar::new("name", "abc");
        assert_eq!(var.data_probe_string(), "abc");
        var.set_data_probe_string("probe");
        assert_eq!(var.data_probe_string(), "probe");
    }

    #[test]
    fn test_bitfield_letters() {
        let var = CVar::new("r_debug", 0).flags(CVarFlags::BITFIELD);
        assert_eq!(var.parse_value("a"), CVarValue::Int(1 << 6));
        assert_eq!(var.parse_value("3ab"), CVarValue::Int(3 | 1 << 6 | 1 << 7));

        let var = CVar::new("r_debug64", 0i64).flags(CVarFlags::BITFIELD);
        assert_eq!(var.parse_value("A"), CVarValue::Int64(1 << 38));
    }

    #[test]
    fn test_bitfield_add_and_remove() {
        let mut var = CVar::new("r_bits", 0).flags(CVarFlags::BITFIELD);
        var.store(CVarValue::Int(1 << 6));
        assert_eq!(var.parse_value("+b"), CVarValue::Int(1 << 6 | 1 << 7));
        assert_eq!(var.parse_value("-a"), CVarValue::Int(0));
    }

    #[test]
    fn test_bitfield_display() {
        let mut var = CVar::new("r_bits", 0).flags(CVarFlags::BITFIELD);
        var.store(CVarValue::Int(3 | 1 << 6 | 1 << 8));
        assert_eq!(var.display_value(), format!("{} (3, ac)", 3 | 1 << 6 | 1 << 8));

        var.store(CVarValue::Int(2));
        assert_eq!(var.display_value(), "2");
    }

    #[test]
    fn test_alpha_bits_inverse() {
        assert_eq!(bits_alpha64(alpha_bits64("azAZ")), "azAZ");
    }

    #[test]
    fn test_flags_string_hides_protection() {
        let flags = CVarFlags::CHEAT | CVarFlags::CONST | CVarFlags::READONLY | CVarFlags::DUMPTODISK;
        assert_eq!(flags_string(flags), "READONLY, DUMPTODISK");
        assert_eq!(flags_string(CVarFlags::CHEAT), "");
        assert_eq!(flags_string(CVarFlags::RESTRICTEDMODE), "RESTRICTEDMODE");
    }

    #[test]
    fn test_store_keeps_type() {
        let mut var = CVar::new("i", 1);
        var.store(CVarValue::Float(7.9));
        assert_eq!(var.value(), &CVarValue::Int(7));

        let mut var = CVar::new("s", "x");
        var.store(CVarValue::Int(5));
        assert_eq!(var.get_string(), "5");
    }

    #[test]
    fn test_cheat_mask() {
        assert!(CVarFlags::CHEAT_NOCHECK.is_cheat());
        assert!(CVarFlags::CHEAT_ALWAYS_CHECK.is_cheat());
        assert!(!CVarFlags::READONLY.is_cheat());
    }
}
