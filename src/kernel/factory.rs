//! Textual construction of covariance functions.
//!
//! The grammar is a kernel name, optionally followed by arguments:
//!
//! ```text
//! expr  := name
//!        | name '(' expr ',' expr ')'
//!        | "InputDimFilter" '(' index '/' expr ')'
//! ```
//!
//! Whitespace is insignificant. `Display` on any kernel produces an
//! expression that parses back to an equivalent kernel:
//!
//! ```
//! use gpr::kernel::factory;
//!
//! let k = factory::create(2, "CovSum(CovSEiso, CovNoise)").unwrap();
//! assert_eq!(k.to_string(), "CovSum(CovSEiso, CovNoise)");
//! assert_eq!(k.param_dim(), 3);
//! ```

use super::{
    CovLinearArd, CovLinearOne, CovMatern3Iso, CovMatern5Iso, CovNoise,
    CovPeriodic, CovPeriodicMatern3Iso, CovProd, CovRBFCS, CovRQIso,
    CovSEard, CovSEiso, CovSum, InputDimFilter, Kernel, KernelError,
};
use std::fmt;

/// Names accepted by [`create`].
pub fn list() -> Vec<&'static str> {
    vec![
        "CovLinearard",
        "CovLinearone",
        "CovMatern3iso",
        "CovMatern5iso",
        "CovNoise",
        "CovPeriodic",
        "CovPeriodicMatern3iso",
        "CovProd",
        "CovRBFCS",
        "CovRQiso",
        "CovSEard",
        "CovSEiso",
        "CovSum",
        "InputDimFilter",
    ]
}

/// Build a kernel for `input_dim`-dimensional inputs from its textual
/// expression.
pub fn create(
    input_dim: usize,
    definition: &str,
) -> Result<Box<dyn Kernel>, ParseError> {
    let mut parser = Parser::new(definition);
    let kernel = parser.expr(input_dim)?;
    parser.expect_end()?;
    Ok(kernel)
}

/// Errors from parsing a kernel expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The named covariance function is not registered
    UnknownCovarianceFunction(String),
    /// A covariance function that takes no arguments was given some
    UnexpectedArguments(String),
    /// Malformed input
    Syntax {
        /// Byte offset into the expression
        position: usize,
        /// What the parser was looking for
        expected: &'static str,
    },
    /// The parsed kernel could not be configured
    Kernel(KernelError),
}

impl std::error::Error for ParseError {}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownCovarianceFunction(name) => write!(
                f,
                "unknown covariance function '{}' (available: {})",
                name,
                list().join(", ")
            ),
            Self::UnexpectedArguments(name) => {
                write!(f, "covariance function '{}' takes no arguments", name)
            }
            Self::Syntax { position, expected } => {
                write!(f, "expected {} at offset {}", expected, position)
            }
            Self::Kernel(e) => write!(f, "invalid kernel configuration: {}", e),
        }
    }
}

impl From<KernelError> for ParseError {
    fn from(e: KernelError) -> Self {
        Self::Kernel(e)
    }
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    fn skip_ws(&mut self) {
        while self
            .peek()
            .map(|c| c.is_ascii_whitespace())
            .unwrap_or(false)
        {
            self.pos += 1;
        }
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn expect(
        &mut self,
        c: char,
        expected: &'static str,
    ) -> Result<(), ParseError> {
        self.skip_ws();
        if self.peek() == Some(c) {
            self.pos += c.len_utf8();
            Ok(())
        } else {
            Err(ParseError::Syntax {
                position: self.pos,
                expected,
            })
        }
    }

    fn ident(&mut self) -> Result<&'a str, ParseError> {
        self.skip_ws();
        let start = self.pos;
        while self
            .peek()
            .map(|c| c.is_ascii_alphanumeric())
            .unwrap_or(false)
        {
            self.pos += 1;
        }
        if self.pos == start {
            Err(ParseError::Syntax {
                position: start,
                expected: "a covariance function name",
            })
        } else {
            Ok(&self.src[start..self.pos])
        }
    }

    fn index(&mut self) -> Result<usize, ParseError> {
        self.skip_ws();
        let start = self.pos;
        while self.peek().map(|c| c.is_ascii_digit()).unwrap_or(false) {
            self.pos += 1;
        }
        self.src[start..self.pos]
            .parse()
            .map_err(|_| ParseError::Syntax {
                position: start,
                expected: "a dimension index",
            })
    }

    fn expr(&mut self, input_dim: usize) -> Result<Box<dyn Kernel>, ParseError> {
        let name = self.ident()?;
        match name {
            "CovSum" | "CovProd" => {
                self.expect('(', "'(' after a compound kernel")?;
                let first = self.expr(input_dim)?;
                self.expect(',', "',' between the two children")?;
                let second = self.expr(input_dim)?;
                self.expect(')', "')' closing the compound kernel")?;
                Ok(if name == "CovSum" {
                    Box::new(CovSum::new(input_dim, first, second))
                } else {
                    Box::new(CovProd::new(input_dim, first, second))
                })
            }
            "InputDimFilter" => {
                self.expect('(', "'(' after the filter kernel")?;
                let filter = self.index()?;
                self.expect('/', "'/' between index and child")?;
                // the nested kernel sees the projected, one-dimensional input
                let nested = self.expr(1)?;
                self.expect(')', "')' closing the filter kernel")?;
                Ok(Box::new(InputDimFilter::new(input_dim, filter, nested)?))
            }
            _ => {
                let kernel: Box<dyn Kernel> = match name {
                    "CovLinearard" => Box::new(CovLinearArd::new(input_dim)),
                    "CovLinearone" => Box::new(CovLinearOne::new(input_dim)),
                    "CovMatern3iso" => Box::new(CovMatern3Iso::new(input_dim)),
                    "CovMatern5iso" => Box::new(CovMatern5Iso::new(input_dim)),
                    "CovNoise" => Box::new(CovNoise::new(input_dim)),
                    "CovPeriodic" => Box::new(CovPeriodic::new(input_dim)),
                    "CovPeriodicMatern3iso" => {
                        Box::new(CovPeriodicMatern3Iso::new(input_dim))
                    }
                    "CovRBFCS" => Box::new(CovRBFCS::new(input_dim)),
                    "CovRQiso" => Box::new(CovRQIso::new(input_dim)),
                    "CovSEard" => Box::new(CovSEard::new(input_dim)),
                    "CovSEiso" => Box::new(CovSEiso::new(input_dim)),
                    _ => {
                        return Err(ParseError::UnknownCovarianceFunction(
                            name.to_string(),
                        ))
                    }
                };
                self.skip_ws();
                if self.peek() == Some('(') {
                    return Err(ParseError::UnexpectedArguments(
                        name.to_string(),
                    ));
                }
                Ok(kernel)
            }
        }
    }

    fn expect_end(&mut self) -> Result<(), ParseError> {
        self.skip_ws();
        if self.pos == self.src.len() {
            Ok(())
        } else {
            Err(ParseError::Syntax {
                position: self.pos,
                expected: "end of expression",
            })
        }
    }
}
