//! Signature verification capability.
//!
//! The settlement engine never implements cryptography itself; it asks a
//! [`SignatureVerifier`] whether a signature over an order hash belongs to
//! the maker. The default verifier treats an [`Address`] as an ed25519
//! public key.

use ed25519_dalek::{Signature, Verifier, VerifyingKey};

use crate::{Address, OrderHash};

/// Checks a signature over an order hash against the claimed signer.
pub trait SignatureVerifier: Send + Sync {
    fn is_valid_signature(&self, hash: &OrderHash, signer: &Address, signature: &[u8]) -> bool;
}

/// Ed25519 verification over the raw 32-byte order hash.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ed25519Verifier;

impl SignatureVerifier for Ed25519Verifier {
    fn is_valid_signature(&self, hash: &OrderHash, signer: &Address, signature: &[u8]) -> bool {
        let Ok(key) = VerifyingKey::from_bytes(signer.as_bytes()) else {
            return false;
        };
        let Ok(signature) = Signature::from_slice(signature) else {
            return false;
        };
        key.verify(hash.as_bytes(), &signature).is_ok()
    }
}

/// Deterministic signing keys for tests. **Never use in production.**
#[cfg(any(test, feature = "test-helpers"))]
pub mod test_keys {
    use ed25519_dalek::{Signer, SigningKey};

    use crate::{Address, Order, SignedOrder};

    /// A party with a deterministic ed25519 key derived from `seed`.
    pub struct TestParty {
        key: SigningKey,
    }

    impl TestParty {
        #[must_use]
        pub fn new(seed: u8) -> Self {
            Self {
                key: SigningKey::from_bytes(&[seed; 32]),
            }
        }

        #[must_use]
        pub fn address(&self) -> Address {
            Address::from(self.key.verifying_key())
        }

        #[must_use]
        pub fn sign(&self, order: &Order) -> Vec<u8> {
            self.key.sign(order.hash().as_bytes()).to_bytes().to_vec()
        }

        #[must_use]
        pub fn sign_order(&self, order: Order) -> SignedOrder {
            let signature = self.sign(&order);
            SignedOrder::new(order, signature)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_keys::TestParty;
    use super::*;
    use crate::Order;

    fn make_order(maker: Address) -> Order {
        Order::dummy(maker, vec![0; 36], 10, vec![1; 36], 20)
    }

    #[test]
    fn valid_signature_verifies() {
        let maker = TestParty::new(1);
        let order = make_order(maker.address());
        let sig = maker.sign(&order);
        assert!(Ed25519Verifier.is_valid_signature(&order.hash(), &maker.address(), &sig));
    }

    #[test]
    fn wrong_signer_rejected() {
        let maker = TestParty::new(1);
        let other = TestParty::new(2);
        let order = make_order(maker.address());
        let sig = other.sign(&order);
        assert!(!Ed25519Verifier.is_valid_signature(&order.hash(), &maker.address(), &sig));
    }

    #[test]
    fn tampered_order_rejected() {
        let maker = TestParty::new(1);
        let mut order = make_order(maker.address());
        let sig = maker.sign(&order);
        order.taker_asset_amount += 1;
        assert!(!Ed25519Verifier.is_valid_signature(&order.hash(), &maker.address(), &sig));
    }

    #[test]
    fn malformed_inputs_rejected() {
        let maker = TestParty::new(1);
        let order = make_order(maker.address());
        assert!(!Ed25519Verifier.is_valid_signature(&order.hash(), &maker.address(), &[0u8; 10]));
        assert!(!Ed25519Verifier.is_valid_signature(&order.hash(), &maker.address(), &[]));
    }
}
