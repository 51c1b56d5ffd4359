//! Sealing values to a viewer's public key using BLS12-381 pairings.
//!
//! A sealed value is readable only by the holder of one viewing key. The
//! construction is a Boneh-Franklin style encryption where the viewer's public
//! key plays the role of the master key and `sk·H(domain)` is the opening key.
//!
//! # Sealing
//!
//! To seal `m` to a viewer with public key `pk = sk·G2`:
//! 1. Compute h = H_1(SEALING_DOMAIN) ∈ G1
//! 2. Sample random scalar r
//! 3. Compute U = r·G2 (ephemeral public key)
//! 4. Compute shared = e(r·h, pk)
//! 5. Derive symmetric key from shared
//! 6. Encrypt m with AES-GCM
//!
//! # Opening
//!
//! 1. Compute shared = e(sk·h, U)
//! 2. Derive symmetric key from shared
//! 3. Decrypt ciphertext with AES-GCM

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use bls12_381::{pairing, G1Affine, G1Projective, G2Affine, G2Projective, Scalar};
use group::Curve;
use hkdf::Hkdf;
use rand::{CryptoRng, RngCore};
use sha2::Sha256;

use vickrey_types::{G1Point, G2Point, SealedValue};

use crate::error::CryptoError;
use crate::keys::ViewingKey;

/// Domain separator hashed to the G1 base used for sealing.
const SEALING_DOMAIN: &[u8] = b"VICKREY_SEALED_VALUE_V1";

/// Seal a plaintext to a viewer's public key.
pub fn seal<R: RngCore + CryptoRng>(
    viewer: &G2Point,
    plaintext: &[u8],
    rng: &mut R,
) -> Result<SealedValue, CryptoError> {
    let pk = decompress_g2(&viewer.0)?;
    let base = hash_to_g1(SEALING_DOMAIN);

    let r = random_scalar(rng);
    let u = (G2Projective::generator() * r).to_affine();

    // e(r·h, pk) = e(h, G2)^{r·sk}
    let r_base = (G1Projective::from(base) * r).to_affine();
    let shared_gt = pairing(&r_base, &pk);
    let key = derive_key_from_gt(&shared_gt)?;

    let mut nonce_bytes = [0u8; 12];
    rng.fill_bytes(&mut nonce_bytes);

    let cipher = Aes256Gcm::new_from_slice(&key)
        .map_err(|e| CryptoError::SealingFailed(format!("Failed to create cipher: {}", e)))?;

    let nonce = Nonce::from_slice(&nonce_bytes);
    let ciphertext_with_tag = cipher
        .encrypt(nonce, plaintext)
        .map_err(|e| CryptoError::SealingFailed(format!("AES-GCM encryption failed: {}", e)))?;

    let tag_start = ciphertext_with_tag.len() - 16;
    let ciphertext = ciphertext_with_tag[..tag_start].to_vec();
    let mut tag = [0u8; 16];
    tag.copy_from_slice(&ciphertext_with_tag[tag_start..]);

    Ok(SealedValue {
        ephemeral_pubkey: compress_g2(&u),
        ciphertext,
        tag,
        nonce: nonce_bytes,
    })
}

/// Open a sealed value with the viewer's key.
pub fn open(sealed: &SealedValue, key: &ViewingKey) -> Result<Vec<u8>, CryptoError> {
    let u = decompress_g2(&sealed.ephemeral_pubkey.0)?;
    let base = hash_to_g1(SEALING_DOMAIN);

    // e(sk·h, U) = e(h, G2)^{sk·r}
    let opening_key = (G1Projective::from(base) * key.secret()).to_affine();
    let shared_gt = pairing(&opening_key, &u);
    let key = derive_key_from_gt(&shared_gt)?;

    let cipher = Aes256Gcm::new_from_slice(&key)
        .map_err(|e| CryptoError::OpeningFailed(format!("Failed to create cipher: {}", e)))?;

    let nonce = Nonce::from_slice(&sealed.nonce);

    let mut ct_with_tag = sealed.ciphertext.clone();
    ct_with_tag.extend_from_slice(&sealed.tag);

    cipher
        .decrypt(nonce, ct_with_tag.as_ref())
        .map_err(|_| CryptoError::AuthenticationFailed)
}

/// Hash arbitrary data to a G1 point.
///
/// Try-and-increment over SHA-256 reduced to a scalar multiple of the
/// generator.
pub fn hash_to_g1(data: &[u8]) -> G1Affine {
    use sha2::{Digest, Sha256};

    let mut counter = 0u64;
    loop {
        let mut hasher = Sha256::new();
        hasher.update(b"BLS12381G1_XMD:SHA-256_SSWU_RO_");
        hasher.update(data);
        hasher.update(counter.to_le_bytes());
        let hash = hasher.finalize();

        if let Some(point) = try_point_from_hash(&hash) {
            return point;
        }
        counter += 1;
    }
}

fn try_point_from_hash(hash: &[u8]) -> Option<G1Affine> {
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&hash[..32]);

    let scalar = Scalar::from_bytes(&bytes);
    if scalar.is_some().into() {
        let scalar = scalar.unwrap();
        Some((G1Projective::generator() * scalar).to_affine())
    } else {
        None
    }
}

/// Generate a random scalar.
pub(crate) fn random_scalar<R: RngCore + CryptoRng>(rng: &mut R) -> Scalar {
    let mut bytes = [0u8; 64];
    rng.fill_bytes(&mut bytes);
    Scalar::from_bytes_wide(&bytes)
}

/// Derive a symmetric key from a GT element.
fn derive_key_from_gt(gt: &bls12_381::Gt) -> Result<[u8; 32], CryptoError> {
    let gt_bytes = gt_to_bytes(gt);

    let hk = Hkdf::<Sha256>::new(None, &gt_bytes);
    let mut key = [0u8; 32];
    hk.expand(b"VICKREY-SEAL-KEY", &mut key)
        .map_err(|_| CryptoError::KeyDerivationFailed)?;

    Ok(key)
}

/// Serialize a GT element to bytes.
fn gt_to_bytes(gt: &bls12_381::Gt) -> Vec<u8> {
    // Gt has no canonical byte encoding in bls12_381; hash its debug form.
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(format!("{:?}", gt).as_bytes());
    hasher.finalize().to_vec()
}

/// Compress a G1 point to bytes.
pub fn compress_g1(point: &G1Affine) -> G1Point {
    G1Point(point.to_compressed())
}

/// Decompress a G1 point from bytes.
pub fn decompress_g1(bytes: &[u8; 48]) -> Result<G1Affine, CryptoError> {
    let point = G1Affine::from_compressed(bytes);
    if point.is_some().into() {
        Ok(point.unwrap())
    } else {
        Err(CryptoError::InvalidG1Point)
    }
}

/// Compress a G2 point to bytes.
pub fn compress_g2(point: &G2Affine) -> G2Point {
    G2Point(point.to_compressed())
}

/// Decompress a G2 point from bytes.
pub fn decompress_g2(bytes: &[u8; 96]) -> Result<G2Affine, CryptoError> {
    let point = G2Affine::from_compressed(bytes);
    if point.is_some().into() {
        Ok(point.unwrap())
    } else {
        Err(CryptoError::InvalidG2Point)
    }
}
