//! Physical units and quantities.
//!
//! A `Unit` is a set of SI base dimension exponents, a scale factor relative to the coherent SI
//! unit with those dimensions, and the symbol it was written with. A `Quantity` is a magnitude
//! paired with a `Unit`. Both can be parsed from the strings found in CSDM documents, e.g.
//! `"2.64 m"`, `"-1.2 ppm"`, `"1/s"`, `"kg * m^2 / s^2"`.
//!
use std::f64::consts::PI;
use std::fmt;
use std::ops::{Div, Mul, Neg};
use std::str::FromStr;

use crate::errors::{Error, Result};

/// SI base dimensional exponents.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct UnitDimensions {
    pub length: i8,
    pub mass: i8,
    pub time: i8,
    pub temperature: i8,
    pub current: i8,
    pub amount: i8,
    pub luminosity: i8,

    /// Plane angle. Dimensionless in SI but tracked so that `rad/s` and `Hz` stay distinct.
    pub angle: i8,
}

impl UnitDimensions {
    pub const NONE: Self = Self {
        length: 0,
        mass: 0,
        time: 0,
        temperature: 0,
        current: 0,
        amount: 0,
        luminosity: 0,
        angle: 0,
    };

    fn combine(self, other: Self, sign: i8) -> Self {
        Self {
            length: self.length + sign * other.length,
            mass: self.mass + sign * other.mass,
            time: self.time + sign * other.time,
            temperature: self.temperature + sign * other.temperature,
            current: self.current + sign * other.current,
            amount: self.amount + sign * other.amount,
            luminosity: self.luminosity + sign * other.luminosity,
            angle: self.angle + sign * other.angle,
        }
    }

    fn scale(self, n: i8) -> Self {
        Self {
            length: self.length * n,
            mass: self.mass * n,
            time: self.time * n,
            temperature: self.temperature * n,
            current: self.current * n,
            amount: self.amount * n,
            luminosity: self.luminosity * n,
            angle: self.angle * n,
        }
    }

    pub fn is_dimensionless(&self) -> bool {
        *self == Self::NONE
    }
}

const NONE: UnitDimensions = UnitDimensions::NONE;

const LENGTH: UnitDimensions = UnitDimensions { length: 1, ..NONE };
const MASS: UnitDimensions = UnitDimensions { mass: 1, ..NONE };
const TIME: UnitDimensions = UnitDimensions { time: 1, ..NONE };
const FREQUENCY: UnitDimensions = UnitDimensions { time: -1, ..NONE };
const TEMPERATURE: UnitDimensions = UnitDimensions {
    temperature: 1,
    ..NONE
};
const CURRENT: UnitDimensions = UnitDimensions { current: 1, ..NONE };
const AMOUNT: UnitDimensions = UnitDimensions { amount: 1, ..NONE };
const LUMINOSITY: UnitDimensions = UnitDimensions {
    luminosity: 1,
    ..NONE
};
const ANGLE: UnitDimensions = UnitDimensions { angle: 1, ..NONE };
const SOLID_ANGLE: UnitDimensions = UnitDimensions { angle: 2, ..NONE };
const SPEED: UnitDimensions = UnitDimensions {
    length: 1,
    time: -1,
    ..NONE
};
const ACCELERATION: UnitDimensions = UnitDimensions {
    length: 1,
    time: -2,
    ..NONE
};
const FORCE: UnitDimensions = UnitDimensions {
    mass: 1,
    length: 1,
    time: -2,
    ..NONE
};
const PRESSURE: UnitDimensions = UnitDimensions {
    mass: 1,
    length: -1,
    time: -2,
    ..NONE
};
const ENERGY: UnitDimensions = UnitDimensions {
    mass: 1,
    length: 2,
    time: -2,
    ..NONE
};
const POWER: UnitDimensions = UnitDimensions {
    mass: 1,
    length: 2,
    time: -3,
    ..NONE
};
const CHARGE: UnitDimensions = UnitDimensions {
    current: 1,
    time: 1,
    ..NONE
};
const POTENTIAL: UnitDimensions = UnitDimensions {
    mass: 1,
    length: 2,
    time: -3,
    current: -1,
    ..NONE
};
const RESISTANCE: UnitDimensions = UnitDimensions {
    mass: 1,
    length: 2,
    time: -3,
    current: -2,
    ..NONE
};
const CONDUCTANCE: UnitDimensions = UnitDimensions {
    mass: -1,
    length: -2,
    time: 3,
    current: 2,
    ..NONE
};
const CAPACITANCE: UnitDimensions = UnitDimensions {
    mass: -1,
    length: -2,
    time: 4,
    current: 2,
    ..NONE
};
const MAGNETIC_FLUX: UnitDimensions = UnitDimensions {
    mass: 1,
    length: 2,
    time: -2,
    current: -1,
    ..NONE
};
const MAGNETIC_FLUX_DENSITY: UnitDimensions = UnitDimensions {
    mass: 1,
    time: -2,
    current: -1,
    ..NONE
};
const AREA: UnitDimensions = UnitDimensions { length: 2, ..NONE };
const VOLUME: UnitDimensions = UnitDimensions { length: 3, ..NONE };
const WAVENUMBER: UnitDimensions = UnitDimensions { length: -1, ..NONE };
const DENSITY: UnitDimensions = UnitDimensions {
    mass: 1,
    length: -3,
    ..NONE
};
const ANGULAR_FREQUENCY: UnitDimensions = UnitDimensions {
    angle: 1,
    time: -1,
    ..NONE
};

struct BaseUnit {
    symbol: &'static str,
    dims: UnitDimensions,
    scale: f64,
    prefixable: bool,
}

const fn base(symbol: &'static str, dims: UnitDimensions, scale: f64, prefixable: bool) -> BaseUnit {
    BaseUnit {
        symbol,
        dims,
        scale,
        prefixable,
    }
}

const BASE_UNITS: &[BaseUnit] = &[
    base("m", LENGTH, 1.0, true),
    base("g", MASS, 1e-3, true),
    base("s", TIME, 1.0, true),
    base("A", CURRENT, 1.0, true),
    base("K", TEMPERATURE, 1.0, true),
    base("mol", AMOUNT, 1.0, true),
    base("cd", LUMINOSITY, 1.0, true),
    base("rad", ANGLE, 1.0, true),
    base("sr", SOLID_ANGLE, 1.0, true),
    base("Hz", FREQUENCY, 1.0, true),
    base("N", FORCE, 1.0, true),
    base("Pa", PRESSURE, 1.0, true),
    base("J", ENERGY, 1.0, true),
    base("W", POWER, 1.0, true),
    base("C", CHARGE, 1.0, true),
    base("V", POTENTIAL, 1.0, true),
    base("Ω", RESISTANCE, 1.0, true),
    base("ohm", RESISTANCE, 1.0, true),
    base("S", CONDUCTANCE, 1.0, true),
    base("F", CAPACITANCE, 1.0, true),
    base("Wb", MAGNETIC_FLUX, 1.0, true),
    base("T", MAGNETIC_FLUX_DENSITY, 1.0, true),
    base("G", MAGNETIC_FLUX_DENSITY, 1e-4, true),
    base("L", VOLUME, 1e-3, true),
    base("l", VOLUME, 1e-3, true),
    base("eV", ENERGY, 1.602_176_634e-19, true),
    base("bar", PRESSURE, 1e5, true),
    base("Å", LENGTH, 1e-10, false),
    base("min", TIME, 60.0, false),
    base("h", TIME, 3600.0, false),
    base("d", TIME, 86400.0, false),
    base("yr", TIME, 31_557_600.0, false),
    base("ppm", NONE, 1e-6, false),
    base("ppb", NONE, 1e-9, false),
    base("%", NONE, 1e-2, false),
    base("°", ANGLE, PI / 180.0, false),
    base("deg", ANGLE, PI / 180.0, false),
];

/// SI prefixes, with two letter prefixes first so that `dam` is read as decameter.
const PREFIXES: &[(&str, f64)] = &[
    ("da", 1e1),
    ("Y", 1e24),
    ("Z", 1e21),
    ("E", 1e18),
    ("P", 1e15),
    ("T", 1e12),
    ("G", 1e9),
    ("M", 1e6),
    ("k", 1e3),
    ("h", 1e2),
    ("d", 1e-1),
    ("c", 1e-2),
    ("m", 1e-3),
    ("µ", 1e-6),
    ("μ", 1e-6),
    ("u", 1e-6),
    ("n", 1e-9),
    ("p", 1e-12),
    ("f", 1e-15),
    ("a", 1e-18),
    ("z", 1e-21),
    ("y", 1e-24),
];

/// Names of physical types keyed by dimensions, used to derive a `quantity_name` from a unit.
const QUANTITY_NAMES: &[(UnitDimensions, &str)] = &[
    (NONE, "dimensionless"),
    (LENGTH, "length"),
    (MASS, "mass"),
    (TIME, "time"),
    (FREQUENCY, "frequency"),
    (TEMPERATURE, "temperature"),
    (CURRENT, "electrical current"),
    (AMOUNT, "amount of substance"),
    (LUMINOSITY, "luminous intensity"),
    (ANGLE, "angle"),
    (SOLID_ANGLE, "solid angle"),
    (SPEED, "speed"),
    (ACCELERATION, "acceleration"),
    (FORCE, "force"),
    (PRESSURE, "pressure"),
    (ENERGY, "energy"),
    (POWER, "power"),
    (CHARGE, "electrical charge"),
    (POTENTIAL, "electrical potential"),
    (RESISTANCE, "electrical resistance"),
    (CONDUCTANCE, "electrical conductance"),
    (CAPACITANCE, "electrical capacitance"),
    (MAGNETIC_FLUX, "magnetic flux"),
    (MAGNETIC_FLUX_DENSITY, "magnetic flux density"),
    (AREA, "area"),
    (VOLUME, "volume"),
    (WAVENUMBER, "wavenumber"),
    (DENSITY, "mass density"),
    (ANGULAR_FREQUENCY, "angular frequency"),
];

/// A physical unit.
///
/// Two units compare equal when they have the same dimensions and scale, regardless of how they
/// are written, so `km` equals `1000 m`.
///
#[derive(Debug, Clone)]
pub struct Unit {
    symbol: String,
    dims: UnitDimensions,
    scale: f64,
}

impl Unit {
    /// The unit of a pure number. Written as an empty string.
    ///
    pub fn dimensionless() -> Self {
        Self {
            symbol: String::new(),
            dims: NONE,
            scale: 1.0,
        }
    }

    /// Parse a unit expression.
    ///
    /// Accepts products (`*`, `·` or whitespace), quotients (`/`), integer powers (`^n` or `**n`),
    /// parentheses and bare numeric factors (`1/s`). An empty string is dimensionless.
    ///
    pub fn parse(text: &str) -> Result<Self> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(Self::dimensionless());
        }

        let tokens = tokenize(text)?;
        let mut parser = Parser {
            text,
            tokens: &tokens,
            pos: 0,
        };
        let unit = parser.expression()?;
        if parser.pos != tokens.len() {
            return Err(Error::UnitParse(format!("unexpected trailing input in `{text}`")));
        }

        Ok(Self {
            symbol: text.to_string(),
            ..unit
        })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn dims(&self) -> UnitDimensions {
        self.dims
    }

    /// Scale factor relative to the coherent SI unit with the same dimensions
    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn is_dimensionless(&self) -> bool {
        self.dims.is_dimensionless()
    }

    pub fn multiply(&self, other: &Unit) -> Unit {
        let symbol = match (self.symbol.is_empty(), other.symbol.is_empty()) {
            (true, _) => other.symbol.clone(),
            (_, true) => self.symbol.clone(),
            _ => format!("{} * {}", self.symbol, other.symbol),
        };

        Unit {
            symbol,
            dims: self.dims.combine(other.dims, 1),
            scale: self.scale * other.scale,
        }
    }

    pub fn divide(&self, other: &Unit) -> Unit {
        let denominator = if is_compound(&other.symbol) {
            format!("({})", other.symbol)
        } else {
            other.symbol.clone()
        };
        let symbol = match (self.symbol.is_empty(), other.symbol.is_empty()) {
            (_, true) => self.symbol.clone(),
            (true, _) => format!("1 / {denominator}"),
            _ => format!("{} / {denominator}", self.symbol),
        };

        Unit {
            symbol,
            dims: self.dims.combine(other.dims, -1),
            scale: self.scale / other.scale,
        }
    }

    pub fn powi(&self, n: i8) -> Unit {
        let symbol = if self.symbol.is_empty() || n == 1 {
            self.symbol.clone()
        } else if is_compound(&self.symbol) {
            format!("({})^{n}", self.symbol)
        } else {
            format!("{}^{n}", self.symbol)
        };

        Unit {
            symbol,
            dims: self.dims.scale(n),
            scale: self.scale.powi(n as i32),
        }
    }

    pub fn inverse(&self) -> Unit {
        let mut inverse = Unit::dimensionless().divide(self);
        if let Some(denominator) = self.symbol.strip_prefix("1 / ") {
            let stripped = strip_parens(denominator);
            if stripped != denominator || !is_compound(denominator) {
                inverse.symbol = stripped.to_string();
            }
        }

        inverse
    }

    /// Whether quantities in this unit can be converted to `other`
    pub fn is_convertible(&self, other: &Unit) -> bool {
        self.dims == other.dims
    }

    /// The factor a value in this unit must be multiplied by to express it in `other`.
    ///
    pub fn factor_to(&self, other: &Unit) -> Result<f64> {
        if !self.is_convertible(other) {
            return Err(Error::UnitIncompatibility {
                left: self.to_string(),
                right: other.to_string(),
            });
        }

        Ok(self.scale / other.scale)
    }

    /// Name of the physical type measured in this unit, e.g. "frequency" for `kHz`.
    ///
    pub fn quantity_name(&self) -> &'static str {
        QUANTITY_NAMES
            .iter()
            .find(|(dims, _)| *dims == self.dims)
            .map(|(_, name)| *name)
            .unwrap_or("unknown")
    }
}

impl PartialEq for Unit {
    fn eq(&self, other: &Self) -> bool {
        self.dims == other.dims && approx_eq(self.scale, other.scale)
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.symbol)
    }
}

impl FromStr for Unit {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

fn approx_eq(a: f64, b: f64) -> bool {
    a == b || (a - b).abs() <= 1e-12 * a.abs().max(b.abs())
}

/// Remove one pair of parentheses enclosing the whole of `symbol`, if present.
fn strip_parens(symbol: &str) -> &str {
    let inner = match symbol.strip_prefix('(').and_then(|s| s.strip_suffix(')')) {
        Some(inner) => inner,
        None => return symbol,
    };

    let mut depth = 0;
    for c in inner.chars() {
        match c {
            '(' => depth += 1,
            ')' if depth == 0 => return symbol,
            ')' => depth -= 1,
            _ => {}
        }
    }

    inner
}

fn is_compound(symbol: &str) -> bool {
    symbol.contains(|c: char| c == ' ' || c == '*' || c == '/' || c == '^')
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Symbol(String),
    Times,
    Divide,
    Power,
    Minus,
    Open,
    Close,
}

fn is_symbol_char(c: char) -> bool {
    c.is_alphabetic() || c == '°' || c == '%' || c == '_'
}

fn tokenize(text: &str) -> Result<Vec<Token>> {
    let mut tokens = vec![];
    let mut chars = text.chars().peekable();
    while let Some(&c) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '*' => {
                chars.next();
                if chars.peek() == Some(&'*') {
                    chars.next();
                    tokens.push(Token::Power);
                } else {
                    tokens.push(Token::Times);
                }
            }
            '·' | '⋅' => {
                chars.next();
                tokens.push(Token::Times);
            }
            '/' => {
                chars.next();
                tokens.push(Token::Divide);
            }
            '^' => {
                chars.next();
                tokens.push(Token::Power);
            }
            '-' => {
                chars.next();
                tokens.push(Token::Minus);
            }
            '(' => {
                chars.next();
                tokens.push(Token::Open);
            }
            ')' => {
                chars.next();
                tokens.push(Token::Close);
            }
            c if c.is_ascii_digit() || c == '.' => {
                let mut number = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_ascii_digit() || c == '.' {
                        number.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let value = number
                    .parse()
                    .map_err(|_| Error::UnitParse(format!("bad number `{number}` in `{text}`")))?;
                tokens.push(Token::Number(value));
            }
            c if is_symbol_char(c) => {
                let mut symbol = String::new();
                while let Some(&c) = chars.peek() {
                    if is_symbol_char(c) {
                        symbol.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Symbol(symbol));
            }
            _ => {
                return Err(Error::UnitParse(format!(
                    "unexpected character `{c}` in `{text}`"
                )));
            }
        }
    }

    Ok(tokens)
}

/// Recursive descent parser over unit tokens.
///
/// ```text
/// expression := term (('*' | '/' | <juxtaposition>) term)*
/// term       := factor (('^' | '**') '-'? number)?
/// factor     := symbol | number | '(' expression ')'
/// ```
///
struct Parser<'a> {
    text: &'a str,
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<&'a Token> {
        let token = self.tokens.get(self.pos);
        self.pos += 1;

        token
    }

    fn error(&self, msg: &str) -> Error {
        Error::UnitParse(format!("{msg} in `{}`", self.text))
    }

    fn expression(&mut self) -> Result<Unit> {
        let mut unit = self.term()?;
        loop {
            match self.peek() {
                Some(Token::Times) => {
                    self.pos += 1;
                    unit = unit.multiply(&self.term()?);
                }
                Some(Token::Divide) => {
                    self.pos += 1;
                    unit = unit.divide(&self.term()?);
                }
                Some(Token::Symbol(_)) | Some(Token::Number(_)) | Some(Token::Open) => {
                    unit = unit.multiply(&self.term()?);
                }
                _ => break,
            }
        }

        Ok(unit)
    }

    fn term(&mut self) -> Result<Unit> {
        let unit = self.factor()?;
        if self.peek() == Some(&Token::Power) {
            self.pos += 1;
            let negative = if self.peek() == Some(&Token::Minus) {
                self.pos += 1;
                true
            } else {
                false
            };
            let exponent = match self.next() {
                Some(Token::Number(n)) if n.fract() == 0.0 && *n < 128.0 => *n as i8,
                _ => return Err(self.error("expected integer exponent")),
            };
            let exponent = if negative { -exponent } else { exponent };

            return Ok(unit.powi(exponent));
        }

        Ok(unit)
    }

    fn factor(&mut self) -> Result<Unit> {
        match self.next() {
            Some(Token::Symbol(symbol)) => lookup(symbol)
                .ok_or_else(|| self.error(&format!("unknown unit `{symbol}`"))),
            Some(Token::Number(n)) => Ok(Unit {
                symbol: String::new(),
                dims: NONE,
                scale: *n,
            }),
            Some(Token::Open) => {
                let unit = self.expression()?;
                match self.next() {
                    Some(Token::Close) => Ok(unit),
                    _ => Err(self.error("unbalanced parentheses")),
                }
            }
            _ => Err(self.error("expected unit")),
        }
    }
}

fn find_base(symbol: &str) -> Option<&'static BaseUnit> {
    BASE_UNITS.iter().find(|unit| unit.symbol == symbol)
}

fn lookup(symbol: &str) -> Option<Unit> {
    if let Some(unit) = find_base(symbol) {
        return Some(Unit {
            symbol: symbol.to_string(),
            dims: unit.dims,
            scale: unit.scale,
        });
    }

    for (prefix, factor) in PREFIXES {
        if let Some(rest) = symbol.strip_prefix(prefix) {
            if let Some(unit) = find_base(rest).filter(|unit| unit.prefixable) {
                return Some(Unit {
                    symbol: symbol.to_string(),
                    dims: unit.dims,
                    scale: unit.scale * factor,
                });
            }
        }
    }

    None
}

/// A magnitude with a unit.
///
#[derive(Debug, Clone, PartialEq)]
pub struct Quantity {
    pub value: f64,
    pub unit: Unit,
}

impl Quantity {
    pub fn new(value: f64, unit: Unit) -> Self {
        Self { value, unit }
    }

    pub fn dimensionless(value: f64) -> Self {
        Self::new(value, Unit::dimensionless())
    }

    /// Zero in the given unit
    pub fn zero(unit: &Unit) -> Self {
        Self::new(0.0, unit.clone())
    }

    /// Parse a quantity string such as `"2.64 m"`, `"1e3Hz"`, `"-0.5"` or `"inf ppm"`.
    ///
    /// A string with no leading number is read as one of the unit, so `"km"` is `1 km`.
    ///
    pub fn parse(text: &str) -> Result<Self> {
        let text = text.trim();
        let (value, rest) = match split_number(text) {
            Some((number, rest)) => {
                let value = number
                    .parse::<f64>()
                    .map_err(|_| Error::UnitParse(format!("bad magnitude in `{text}`")))?;
                (value, rest)
            }
            None => (1.0, text),
        };

        Ok(Self::new(value, Unit::parse(rest)?))
    }

    /// Convert to another unit.
    ///
    pub fn to(&self, unit: &Unit) -> Result<Quantity> {
        Ok(Quantity::new(self.value_in(unit)?, unit.clone()))
    }

    /// Magnitude of this quantity expressed in `unit`.
    ///
    pub fn value_in(&self, unit: &Unit) -> Result<f64> {
        Ok(self.value * self.unit.factor_to(unit)?)
    }

    /// Add two quantities, giving a result in the unit of `self`.
    ///
    pub fn checked_add(&self, other: &Quantity) -> Result<Quantity> {
        Ok(Quantity::new(
            self.value + other.value_in(&self.unit)?,
            self.unit.clone(),
        ))
    }

    /// Subtract two quantities, giving a result in the unit of `self`.
    ///
    pub fn checked_sub(&self, other: &Quantity) -> Result<Quantity> {
        Ok(Quantity::new(
            self.value - other.value_in(&self.unit)?,
            self.unit.clone(),
        ))
    }

    pub fn inverse(&self) -> Quantity {
        Quantity::new(1.0 / self.value, self.unit.inverse())
    }

    pub fn is_zero(&self) -> bool {
        self.value == 0.0
    }
}

impl Mul<f64> for Quantity {
    type Output = Quantity;

    fn mul(self, rhs: f64) -> Quantity {
        Quantity::new(self.value * rhs, self.unit)
    }
}

impl Div<f64> for Quantity {
    type Output = Quantity;

    fn div(self, rhs: f64) -> Quantity {
        Quantity::new(self.value / rhs, self.unit)
    }
}

impl Mul<&Quantity> for &Quantity {
    type Output = Quantity;

    fn mul(self, rhs: &Quantity) -> Quantity {
        Quantity::new(self.value * rhs.value, self.unit.multiply(&rhs.unit))
    }
}

impl Div<&Quantity> for &Quantity {
    type Output = Quantity;

    fn div(self, rhs: &Quantity) -> Quantity {
        Quantity::new(self.value / rhs.value, self.unit.divide(&rhs.unit))
    }
}

impl Neg for Quantity {
    type Output = Quantity;

    fn neg(self) -> Quantity {
        Quantity::new(-self.value, self.unit)
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.unit.symbol.is_empty() {
            write!(f, "{:?}", self.value)
        } else {
            write!(f, "{:?} {}", self.value, self.unit)
        }
    }
}

impl FromStr for Quantity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Split a leading floating point literal off of `text`.
///
fn split_number(text: &str) -> Option<(&str, &str)> {
    let bytes = text.as_bytes();
    let mut i = 0;
    if i < bytes.len() && (bytes[i] == b'+' || bytes[i] == b'-') {
        i += 1;
    }

    let lower = text[i..].to_ascii_lowercase();
    for word in ["infinity", "inf", "nan"] {
        if lower.starts_with(word) {
            let end = i + word.len();
            return Some((&text[..end], &text[end..]));
        }
    }

    let mut digits = 0;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
        digits += 1;
    }
    if i < bytes.len() && bytes[i] == b'.' {
        i += 1;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
            digits += 1;
        }
    }
    if digits == 0 {
        return None;
    }

    if i < bytes.len() && (bytes[i] == b'e' || bytes[i] == b'E') {
        let mut j = i + 1;
        if j < bytes.len() && (bytes[j] == b'+' || bytes[j] == b'-') {
            j += 1;
        }
        if j < bytes.len() && bytes[j].is_ascii_digit() {
            while j < bytes.len() && bytes[j].is_ascii_digit() {
                j += 1;
            }
            i = j;
        }
    }

    Some((&text[..i], &text[i..]))
}
