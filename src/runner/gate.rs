//! Applicability gates for update steps.
//!
//! A gate wraps a step body and, before running it, checks the current
//! machine. When the machine does not qualify the wrapped step returns a
//! [`NotApplicable`] signal instead, which the runner records as a skip.
//!
//! ```
//! use homeconf_cli::config::machines::MachineType;
//! use homeconf_cli::runner::{Updates, only_if_any_type, unless_any_type};
//!
//! let updates = Updates::new()
//!     .step(only_if_any_type(&[MachineType::Server], |ctx| {
//!         ctx.log.info("server-only update");
//!         Ok(())
//!     }))
//!     .step(unless_any_type(&[MachineType::Laptop], |_ctx| Ok(())));
//! assert_eq!(updates.len(), 2);
//! ```
use std::fmt;

use anyhow::Result;

use super::Context;
use crate::config::machines::MachineType;
use crate::error::NotApplicable;

/// A predicate over the current machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Gate {
    /// The machine has at least one of these types.
    OnlyIfAnyType(Vec<MachineType>),
    /// The machine has none of these types.
    UnlessAnyType(Vec<MachineType>),
    /// The hostname is one of these.
    OnlyIfHostname(Vec<String>),
}

impl Gate {
    /// Whether the current machine passes the gate.
    #[must_use]
    pub fn admits(&self, ctx: &Context) -> bool {
        match self {
            Self::OnlyIfAnyType(types) => ctx.is_of_any_type(types),
            Self::UnlessAnyType(types) => !ctx.is_of_any_type(types),
            Self::OnlyIfHostname(names) => ctx.is_host(names.as_slice()),
        }
    }

    /// `Ok` if the gate admits the machine, the skip signal otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`NotApplicable`] naming the gate and the host.
    pub fn check(&self, ctx: &Context) -> Result<(), NotApplicable> {
        if self.admits(ctx) {
            Ok(())
        } else {
            Err(NotApplicable::new(format!("{self}; {} does not qualify", ctx.hostname)))
        }
    }

    /// Wrap `body` so that it only runs when the gate admits the machine.
    pub fn wrap<F>(self, body: F) -> impl Fn(&Context) -> Result<()> + Send + Sync + 'static
    where
        F: Fn(&Context) -> Result<()> + Send + Sync + 'static,
    {
        move |ctx: &Context| {
            self.check(ctx)?;
            body(ctx)
        }
    }
}

impl fmt::Display for Gate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (label, items) = match self {
            Self::OnlyIfAnyType(types) => ("only for", join(types)),
            Self::UnlessAnyType(types) => ("not for", join(types)),
            Self::OnlyIfHostname(names) => ("only on", join(names)),
        };
        if items.is_empty() {
            write!(f, "{label} (nothing)")
        } else {
            write!(f, "{label} {items}")
        }
    }
}

fn join<T: fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Run `body` only if the machine has at least one of `types`.
pub fn only_if_any_type<F>(
    types: &[MachineType],
    body: F,
) -> impl Fn(&Context) -> Result<()> + Send + Sync + 'static
where
    F: Fn(&Context) -> Result<()> + Send + Sync + 'static,
{
    Gate::OnlyIfAnyType(types.to_vec()).wrap(body)
}

/// Run `body` only if the machine has none of `types`.
pub fn unless_any_type<F>(
    types: &[MachineType],
    body: F,
) -> impl Fn(&Context) -> Result<()> + Send + Sync + 'static
where
    F: Fn(&Context) -> Result<()> + Send + Sync + 'static,
{
    Gate::UnlessAnyType(types.to_vec()).wrap(body)
}

/// Run `body` only on the listed hosts. An empty list admits no host.
pub fn only_if_hostname<F>(
    names: &[&str],
    body: F,
) -> impl Fn(&Context) -> Result<()> + Send + Sync + 'static
where
    F: Fn(&Context) -> Result<()> + Send + Sync + 'static,
{
    Gate::OnlyIfHostname(names.iter().map(ToString::to_string).collect()).wrap(body)
}
