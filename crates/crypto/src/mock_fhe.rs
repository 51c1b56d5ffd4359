//! In-process FHE backend for development and tests.
//!
//! `MockFhe` keeps plaintexts in a private table keyed by handle, much like a
//! coprocessor running in mock mode. Callers only ever see handles; handles
//! are derived from a counter, never from the values. Reencryption is real:
//! values leave the backend sealed to the viewer's key.
//!
//! The backend counts every handle it produces so tests can check that a
//! code path performs the same homomorphic work whatever the inputs are.

use parking_lot::RwLock;
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use vickrey_types::{Ebool, Euint64, G2Point, Handle, SealedValue};

use crate::fhe::{FheBackend, FheError};
use crate::sealing::seal;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Plaintext {
    Bool(bool),
    U64(u64),
}

#[derive(Debug, Default)]
struct Store {
    values: HashMap<Handle, Plaintext>,
    next: u64,
}

/// Plaintext-backed implementation of [`FheBackend`].
#[derive(Debug, Default)]
pub struct MockFhe {
    store: RwLock<Store>,
    ops: AtomicU64,
}

impl MockFhe {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of handles produced so far.
    pub fn ops_executed(&self) -> u64 {
        self.ops.load(Ordering::SeqCst)
    }

    fn insert(&self, op: &[u8], value: Plaintext) -> Handle {
        let mut store = self.store.write();
        let index = store.next;
        store.next += 1;

        let mut hasher = Sha256::new();
        hasher.update(b"VICKREY_HANDLE_V1:");
        hasher.update(op);
        hasher.update(index.to_le_bytes());
        let handle = Handle(hasher.finalize().into());

        store.values.insert(handle, value);
        self.ops.fetch_add(1, Ordering::SeqCst);
        handle
    }

    fn load(&self, handle: &Handle) -> Result<Plaintext, FheError> {
        self.store
            .read()
            .values
            .get(handle)
            .copied()
            .ok_or(FheError::UnknownHandle(*handle))
    }

    fn load_u64(&self, value: &Euint64) -> Result<u64, FheError> {
        match self.load(&value.0)? {
            Plaintext::U64(v) => Ok(v),
            Plaintext::Bool(_) => Err(FheError::TypeMismatch(value.0)),
        }
    }

    fn load_bool(&self, value: &Ebool) -> Result<bool, FheError> {
        match self.load(&value.0)? {
            Plaintext::Bool(b) => Ok(b),
            Plaintext::U64(_) => Err(FheError::TypeMismatch(value.0)),
        }
    }

    fn new_u64(&self, op: &[u8], value: u64) -> Euint64 {
        Euint64(self.insert(op, Plaintext::U64(value)))
    }

    fn new_bool(&self, op: &[u8], value: bool) -> Ebool {
        Ebool(self.insert(op, Plaintext::Bool(value)))
    }
}

impl FheBackend for MockFhe {
    fn encrypt_u64(&self, value: u64) -> Euint64 {
        self.new_u64(b"input", value)
    }

    fn trivial_u64(&self, value: u64) -> Euint64 {
        self.new_u64(b"trivial", value)
    }

    fn trivial_bool(&self, value: bool) -> Ebool {
        self.new_bool(b"trivial", value)
    }

    fn add(&self, a: &Euint64, b: &Euint64) -> Result<Euint64, FheError> {
        let (a, b) = (self.load_u64(a)?, self.load_u64(b)?);
        Ok(self.new_u64(b"add", a.wrapping_add(b)))
    }

    fn sub(&self, a: &Euint64, b: &Euint64) -> Result<Euint64, FheError> {
        let (a, b) = (self.load_u64(a)?, self.load_u64(b)?);
        Ok(self.new_u64(b"sub", a.wrapping_sub(b)))
    }

    fn gt(&self, a: &Euint64, b: &Euint64) -> Result<Ebool, FheError> {
        let (a, b) = (self.load_u64(a)?, self.load_u64(b)?);
        Ok(self.new_bool(b"gt", a > b))
    }

    fn ge(&self, a: &Euint64, b: &Euint64) -> Result<Ebool, FheError> {
        let (a, b) = (self.load_u64(a)?, self.load_u64(b)?);
        Ok(self.new_bool(b"ge", a >= b))
    }

    fn eq(&self, a: &Euint64, b: &Euint64) -> Result<Ebool, FheError> {
        let (a, b) = (self.load_u64(a)?, self.load_u64(b)?);
        Ok(self.new_bool(b"eq", a == b))
    }

    fn and(&self, a: &Ebool, b: &Ebool) -> Result<Ebool, FheError> {
        let (a, b) = (self.load_bool(a)?, self.load_bool(b)?);
        Ok(self.new_bool(b"and", a & b))
    }

    fn not(&self, a: &Ebool) -> Result<Ebool, FheError> {
        let a = self.load_bool(a)?;
        Ok(self.new_bool(b"not", !a))
    }

    fn select(&self, cond: &Ebool, a: &Euint64, b: &Euint64) -> Result<Euint64, FheError> {
        let cond = self.load_bool(cond)?;
        let (a, b) = (self.load_u64(a)?, self.load_u64(b)?);
        // Branch-free mux over the two loaded values.
        let mask = (cond as u64).wrapping_neg();
        Ok(self.new_u64(b"select", (a & mask) | (b & !mask)))
    }

    fn reencrypt_u64(&self, value: &Euint64, viewer: &G2Point) -> Result<SealedValue, FheError> {
        let plaintext = self.load_u64(value)?;
        Ok(seal(viewer, &plaintext.to_le_bytes(), &mut OsRng)?)
    }

    fn reencrypt_bool(&self, value: &Ebool, viewer: &G2Point) -> Result<SealedValue, FheError> {
        let plaintext = self.load_bool(value)?;
        Ok(seal(viewer, &[plaintext as u8], &mut OsRng)?)
    }

    fn decrypt_u64(&self, value: &Euint64) -> Result<u64, FheError> {
        self.load_u64(value)
    }

    fn decrypt_bool(&self, value: &Ebool) -> Result<bool, FheError> {
        self.load_bool(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::ViewingKey;
    use crate::sealing::open;

    #[test]
    fn test_compare_and_select() {
        let fhe = MockFhe::new();
        let ten = fhe.encrypt_u64(10);
        let twenty = fhe.encrypt_u64(20);

        let gt = fhe.gt(&twenty, &ten).unwrap();
        assert!(fhe.decrypt_bool(&gt).unwrap());

        let picked = fhe.select(&gt, &twenty, &ten).unwrap();
        assert_eq!(fhe.decrypt_u64(&picked).unwrap(), 20);

        let not_gt = fhe.not(&gt).unwrap();
        let picked = fhe.select(&not_gt, &twenty, &ten).unwrap();
        assert_eq!(fhe.decrypt_u64(&picked).unwrap(), 10);
    }

    #[test]
    fn test_handles_do_not_depend_on_values() {
        let a = MockFhe::new();
        let b = MockFhe::new();
        assert_eq!(a.encrypt_u64(1), b.encrypt_u64(999));
    }

    #[test]
    fn test_wrapping_arithmetic() {
        let fhe = MockFhe::new();
        let zero = fhe.trivial_u64(0);
        let one = fhe.trivial_u64(1);
        let wrapped = fhe.sub(&zero, &one).unwrap();
        assert_eq!(fhe.decrypt_u64(&wrapped).unwrap(), u64::MAX);
    }

    #[test]
    fn test_type_mismatch() {
        let fhe = MockFhe::new();
        let flag = fhe.trivial_bool(true);
        let value = Euint64(flag.0);
        assert!(matches!(
            fhe.decrypt_u64(&value),
            Err(FheError::TypeMismatch(_))
        ));
    }

    #[test]
    fn test_unknown_handle() {
        let fhe = MockFhe::new();
        let missing = Euint64(Handle([0u8; 32]));
        assert!(matches!(
            fhe.decrypt_u64(&missing),
            Err(FheError::UnknownHandle(_))
        ));
    }

    #[test]
    fn test_reencrypt_for_viewer() {
        let fhe = MockFhe::new();
        let viewer = ViewingKey::generate(&mut OsRng);
        let secret = fhe.encrypt_u64(42);

        let sealed = fhe.reencrypt_u64(&secret, &viewer.public_point()).unwrap();
        let opened = open(&sealed, &viewer).unwrap();

        assert_eq!(opened, 42u64.to_le_bytes());
    }

    #[test]
    fn test_op_counter() {
        let fhe = MockFhe::new();
        let a = fhe.encrypt_u64(3);
        let b = fhe.encrypt_u64(4);
        let before = fhe.ops_executed();
        fhe.add(&a, &b).unwrap();
        fhe.eq(&a, &b).unwrap();
        assert_eq!(fhe.ops_executed() - before, 2);
    }
}
