//! Architecture support layer.
//!
//! Cooperative switching needs exactly two primitives per architecture: a
//! snapshot of the callee-saved register state (everything else is dead
//! across an explicit call by ABI contract) and a routine that stores the
//! current snapshot and resumes another. Fresh threads get a synthetic
//! snapshot whose resume point is the thread entry trampoline.

#[cfg(target_arch = "x86_64")]
mod x86_64;
#[cfg(target_arch = "x86_64")]
pub use x86_64::Context;
#[cfg(target_arch = "x86_64")]
pub(crate) use x86_64::{context_load, context_switch};

#[cfg(target_arch = "aarch64")]
mod aarch64;
#[cfg(target_arch = "aarch64")]
pub use aarch64::Context;
#[cfg(target_arch = "aarch64")]
pub(crate) use aarch64::{context_load, context_switch};

#[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
compile_error!(
    "context switching is implemented for x86_64 and aarch64 only; \
     port src/arch to the target architecture"
);
