//! x86_64 context switching (System V ABI).

use core::arch::naked_asm;

use crate::config::STACK_ALIGN;

/// Saved execution context of a suspended thread or of the scheduler.
///
/// Holds the System V callee-saved registers plus the stack pointer. The
/// return address of the suspension point stays on the suspended stack
/// itself, where the final `ret` of [`context_switch`] picks it up.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct Context {
    pub rsp: u64,
    pub rbp: u64,
    pub rbx: u64,
    pub r12: u64,
    pub r13: u64,
    pub r14: u64,
    pub r15: u64,
}

impl Context {
    /// All-zero context. Must be saved into before it is ever resumed.
    pub(crate) const ZERO: Context = Context {
        rsp: 0,
        rbp: 0,
        rbx: 0,
        r12: 0,
        r13: 0,
        r14: 0,
        r15: 0,
    };

    /// Build a context that enters `entry` on a fresh stack ending at
    /// `stack_top` (exclusive).
    ///
    /// # Safety
    ///
    /// `stack_top` must point one past the end of a writable region large
    /// enough for the entry routine's frames.
    pub(crate) unsafe fn prepare(entry: usize, stack_top: *mut u8) -> Context {
        // Mimic the stack right after a `call`: the entry address sits at
        // [rsp] for the switch's final `ret`, which leaves rsp ≡ 8 (mod 16)
        // at function entry as the ABI requires.
        let mut sp = (stack_top as usize) & !(STACK_ALIGN - 1);
        sp -= 16;
        unsafe { (sp as *mut usize).write(entry) };

        Context {
            rsp: sp as u64,
            ..Context::ZERO
        }
    }
}

/// Store the current execution state into `save` and resume `load`.
///
/// Returns when some other context later switches back into `save`.
///
/// # Safety
///
/// `save` must be writable; `load` must hold a context that was produced
/// by a previous save or by [`Context::prepare`], and whose stack is still
/// valid.
#[unsafe(naked)]
pub(crate) unsafe extern "C" fn context_switch(_save: *mut Context, _load: *const Context) {
    naked_asm!(
        "mov [rdi + 0x00], rsp",
        "mov [rdi + 0x08], rbp",
        "mov [rdi + 0x10], rbx",
        "mov [rdi + 0x18], r12",
        "mov [rdi + 0x20], r13",
        "mov [rdi + 0x28], r14",
        "mov [rdi + 0x30], r15",
        "mov rsp, [rsi + 0x00]",
        "mov rbp, [rsi + 0x08]",
        "mov rbx, [rsi + 0x10]",
        "mov r12, [rsi + 0x18]",
        "mov r13, [rsi + 0x20]",
        "mov r14, [rsi + 0x28]",
        "mov r15, [rsi + 0x30]",
        // For a fresh context this pops the entry trampoline, otherwise the
        // suspension point of the matching save.
        "ret",
    )
}

/// Resume `load`, abandoning the current execution state.
///
/// Used when the current stack is about to be reclaimed and there is
/// nothing left to save.
///
/// # Safety
///
/// Same as [`context_switch`] for `load`; the current stack must not be
/// relied on afterwards.
#[unsafe(naked)]
pub(crate) unsafe extern "C" fn context_load(_load: *const Context) -> ! {
    naked_asm!(
        "mov rsp, [rdi + 0x00]",
        "mov rbp, [rdi + 0x08]",
        "mov rbx, [rdi + 0x10]",
        "mov r12, [rdi + 0x18]",
        "mov r13, [rdi + 0x20]",
        "mov r14, [rdi + 0x28]",
        "mov r15, [rdi + 0x30]",
        "ret",
    )
}
