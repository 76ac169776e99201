//! The PidGenX validation engine boundary.
//!
//! The engine is a black box: it takes a product key and a `pkeyconfig`
//! path, writes into three caller-owned buffers, and returns a status code
//! (`0` on success). Nothing about it is assumed to be thread-safe, so every
//! call plus the read of its buffers runs under [`with_engine_lock`].

use std::path::Path;
use std::sync::{Mutex, PoisonError};

/// Size of the product id buffer.
pub const PID_LEN: usize = 0x32;
/// Size of the legacy Digital Product ID buffer.
pub const DPID_LEN: usize = 0xA4;
/// Size of the Digital Product ID 4 buffer.
pub const DPID4_LEN: usize = 0x4F8;

static ENGINE_LOCK: Mutex<()> = Mutex::new(());

/// Runs `f` while holding the process-wide engine lock.
pub fn with_engine_lock<T>(f: impl FnOnce() -> T) -> T {
    let _guard = ENGINE_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
    f()
}

/// Arguments for one engine call.
#[derive(Debug, Clone, Copy)]
pub struct PidGenRequest<'a> {
    pub product_key: &'a str,
    pub config_path: &'a Path,
    pub marketplace_id: &'a str,
    pub usage: i32,
}

/// The three output buffers of an engine call.
#[derive(Clone, PartialEq, Eq)]
pub struct PidBuffers {
    pub pid: [u8; PID_LEN],
    pub dpid: [u8; DPID_LEN],
    pub dpid4: [u8; DPID4_LEN],
}

impl PidBuffers {
    /// Zeroed buffers with the length markers the engine expects.
    #[must_use]
    pub fn seeded() -> Self {
        let mut buffers = Self {
            pid: [0; PID_LEN],
            dpid: [0; DPID_LEN],
            dpid4: [0; DPID4_LEN],
        };
        buffers.pid[0] = PID_LEN as u8;
        buffers.dpid[0] = DPID_LEN as u8;
        buffers.dpid4[..2].copy_from_slice(&(DPID4_LEN as u16).to_le_bytes());
        buffers
    }
}

impl std::fmt::Debug for PidBuffers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PidBuffers")
            .field("pid", &PID_LEN)
            .field("dpid", &DPID_LEN)
            .field("dpid4", &DPID4_LEN)
            .finish()
    }
}

/// A key validation engine with the PidGenX call shape.
pub trait ValidationEngine: Send + Sync {
    /// Validates `request` and fills `buffers`. Returns `0` on success.
    fn pid_gen(&self, request: &PidGenRequest<'_>, buffers: &mut PidBuffers) -> i32;
}

#[cfg(all(windows, feature = "native"))]
pub use native::NativePidGen;

#[cfg(all(windows, feature = "native"))]
mod native {
    use super::{PidBuffers, PidGenRequest, ValidationEngine};
    use std::ffi::OsStr;
    use std::os::windows::ffi::OsStrExt;

    #[link(name = "pidgenx", kind = "raw-dylib")]
    unsafe extern "system" {
        fn PidGenX(
            product_key: *const u16,
            pkey_path: *const u16,
            mspid: *const u16,
            unknown_usage: i32,
            product_id: *mut u8,
            digital_product_id: *mut u8,
            digital_product_id4: *mut u8,
        ) -> i32;
    }

    fn wide(s: &OsStr) -> Vec<u16> {
        s.encode_wide().chain(std::iter::once(0)).collect()
    }

    /// `PidGenX` exported by `pidgenx.dll`.
    #[derive(Debug, Default, Clone, Copy)]
    pub struct NativePidGen;

    impl ValidationEngine for NativePidGen {
        fn pid_gen(&self, request: &PidGenRequest<'_>, buffers: &mut PidBuffers) -> i32 {
            let key = wide(OsStr::new(request.product_key));
            let path = wide(request.config_path.as_os_str());
            let mspid = wide(OsStr::new(request.marketplace_id));

            // SAFETY: the strings are NUL-terminated and outlive the call, and
            // each buffer pointer covers the full length the engine writes.
            unsafe {
                PidGenX(
                    key.as_ptr(),
                    path.as_ptr(),
                    mspid.as_ptr(),
                    request.usage,
                    buffers.pid.as_mut_ptr(),
                    buffers.dpid.as_mut_ptr(),
                    buffers.dpid4.as_mut_ptr(),
                )
            }
        }
    }
}
