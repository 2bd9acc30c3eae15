//! Macro for implementing Display and FromStr for wire enums
//!
//! Invoice statuses, operations and provider tenancy policies travel as
//! lowercase strings on the bus, in query strings and in the database. This
//! macro keeps the textual form in one place.
//!
//! # Example
//!
//! ```rust
//! use integrahub_domain::impl_wire_enum_conversions;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! pub enum DeliveryState {
//!     Queued,
//!     Delivered,
//! }
//!
//! impl_wire_enum_conversions!(DeliveryState {
//!     Queued => "queued",
//!     Delivered => "delivered",
//! });
//!
//! assert_eq!(DeliveryState::Queued.to_string(), "queued");
//! assert_eq!("DELIVERED".parse::<DeliveryState>(), Ok(DeliveryState::Delivered));
//! ```

/// Implements Display, FromStr and `as_str` for wire enums
///
/// - Display: converts enum variants to their lowercase wire strings
/// - FromStr: parses case-insensitive strings to enum variants
/// - `as_str`: borrow the wire string without allocating
#[macro_export]
macro_rules! impl_wire_enum_conversions {
    ($enum_name:ident { $($variant:ident => $str:expr),+ $(,)? }) => {
        impl $enum_name {
            /// Wire representation of the variant.
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $str,)+
                }
            }
        }

        impl std::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $enum_name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_lowercase().as_str() {
                    $($str => Ok(Self::$variant),)+
                    _ => Err(format!("Invalid {}: {}", stringify!($enum_name), s)),
                }
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Channel {
        Storefront,
        Marketplace,
    }

    impl_wire_enum_conversions!(Channel {
        Storefront => "storefront",
        Marketplace => "marketplace",
    });

    #[test]
    fn display_uses_wire_string() {
        assert_eq!(Channel::Storefront.to_string(), "storefront");
        assert_eq!(Channel::Marketplace.as_str(), "marketplace");
    }

    #[test]
    fn parse_is_case_insensitive_and_trimmed() {
        assert_eq!(Channel::from_str(" MarketPlace ").unwrap(), Channel::Marketplace);
    }

    #[test]
    fn parse_rejects_unknown_values() {
        let err = Channel::from_str("pos").unwrap_err();
        assert!(err.contains("Invalid Channel: pos"));
    }
}
