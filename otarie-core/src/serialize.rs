//! Byte serialization for every key and data object.
//!
//! Layout: a one-byte kind tag, the 64-bit parameter fingerprint (0 for
//! plaintexts, which are not bound to a context), the shape counts, then
//! the raw coefficient words little-endian in fixed factor order.
//! Round-trips are bit-identical.

use std::io::{self, Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use fnv::FnvHashMap;
use otarie_math::poly::RnsPoly;

use crate::ciphertext::Ciphertext;
use crate::keys::{EvaluationKeySet, GaloisKeySet, KswKey, PublicKey, SecretKey};
use crate::plaintext::Plaintext;

const TAG_PLAINTEXT: u8 = 1;
const TAG_CIPHERTEXT: u8 = 2;
const TAG_SECRET_KEY: u8 = 3;
const TAG_PUBLIC_KEY: u8 = 4;
const TAG_EVALUATION_KEYS: u8 = 5;
const TAG_GALOIS_KEYS: u8 = 6;

fn check_tag<R: Read>(reader: &mut R, expected: u8) -> io::Result<()> {
    let tag: u8 = reader.read_u8()?;
    if tag != expected {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("expected object tag {}, found {}", expected, tag),
        ));
    }
    Ok(())
}

fn write_words<W: Write>(writer: &mut W, words: &[u64]) -> io::Result<()> {
    for &w in words {
        writer.write_u64::<LittleEndian>(w)?;
    }
    Ok(())
}

fn read_words<R: Read>(reader: &mut R, out: &mut [u64]) -> io::Result<()> {
    for w in out.iter_mut() {
        *w = reader.read_u64::<LittleEndian>()?;
    }
    Ok(())
}

fn write_rns_poly<W: Write>(writer: &mut W, poly: &RnsPoly) -> io::Result<()> {
    writer.write_u64::<LittleEndian>(poly.factors() as u64)?;
    writer.write_u64::<LittleEndian>(poly.n() as u64)?;
    for row in poly.0.iter() {
        write_words(writer, row)?;
    }
    Ok(())
}

fn read_rns_poly<R: Read>(reader: &mut R) -> io::Result<RnsPoly> {
    let factors: usize = reader.read_u64::<LittleEndian>()? as usize;
    let n: usize = reader.read_u64::<LittleEndian>()? as usize;
    if factors == 0 || n == 0 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "polynomial with an empty dimension",
        ));
    }
    let mut poly: RnsPoly = RnsPoly::new(n, factors);
    for row in poly.0.iter_mut() {
        read_words(reader, row)?;
    }
    Ok(poly)
}

fn write_ksw_key<W: Write>(writer: &mut W, key: &KswKey) -> io::Result<()> {
    writer.write_u64::<LittleEndian>(key.k0.len() as u64)?;
    for (k0, k1) in key.k0.iter().zip(key.k1.iter()) {
        write_rns_poly(writer, k0)?;
        write_rns_poly(writer, k1)?;
    }
    Ok(())
}

fn read_ksw_key<R: Read>(reader: &mut R) -> io::Result<KswKey> {
    let digits: usize = reader.read_u64::<LittleEndian>()? as usize;
    let mut k0: Vec<RnsPoly> = Vec::with_capacity(digits);
    let mut k1: Vec<RnsPoly> = Vec::with_capacity(digits);
    for _ in 0..digits {
        k0.push(read_rns_poly(reader)?);
        k1.push(read_rns_poly(reader)?);
    }
    Ok(KswKey { k0, k1 })
}

impl Plaintext {
    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_u8(TAG_PLAINTEXT)?;
        writer.write_u64::<LittleEndian>(0)?;
        writer.write_u64::<LittleEndian>(self.coeff_count() as u64)?;
        write_words(writer, self.coeffs())
    }

    pub fn read_from<R: Read>(reader: &mut R) -> io::Result<Plaintext> {
        check_tag(reader, TAG_PLAINTEXT)?;
        let _fingerprint: u64 = reader.read_u64::<LittleEndian>()?;
        let count: usize = reader.read_u64::<LittleEndian>()? as usize;
        let mut coeffs: Vec<u64> = vec![0; count];
        read_words(reader, &mut coeffs)?;
        Ok(Plaintext::from_coeffs(coeffs))
    }
}

impl Ciphertext {
    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_u8(TAG_CIPHERTEXT)?;
        writer.write_u64::<LittleEndian>(self.fingerprint())?;
        writer.write_u64::<LittleEndian>(self.size() as u64)?;
        for poly in self.data.iter() {
            write_rns_poly(writer, poly)?;
        }
        Ok(())
    }

    pub fn read_from<R: Read>(reader: &mut R) -> io::Result<Ciphertext> {
        check_tag(reader, TAG_CIPHERTEXT)?;
        let fingerprint: u64 = reader.read_u64::<LittleEndian>()?;
        let size: usize = reader.read_u64::<LittleEndian>()? as usize;
        if size < 2 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("ciphertext size {} is below the minimum of 2", size),
            ));
        }
        let mut data: Vec<RnsPoly> = Vec::with_capacity(size);
        for _ in 0..size {
            data.push(read_rns_poly(reader)?);
        }
        Ok(Ciphertext { data, fingerprint })
    }
}

impl SecretKey {
    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_u8(TAG_SECRET_KEY)?;
        writer.write_u64::<LittleEndian>(self.fingerprint)?;
        write_rns_poly(writer, &self.s_ntt)
    }

    pub fn read_from<R: Read>(reader: &mut R) -> io::Result<SecretKey> {
        check_tag(reader, TAG_SECRET_KEY)?;
        let fingerprint: u64 = reader.read_u64::<LittleEndian>()?;
        Ok(SecretKey {
            s_ntt: read_rns_poly(reader)?,
            fingerprint,
        })
    }
}

impl PublicKey {
    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_u8(TAG_PUBLIC_KEY)?;
        writer.write_u64::<LittleEndian>(self.fingerprint)?;
        write_rns_poly(writer, &self.p0)?;
        write_rns_poly(writer, &self.p1)
    }

    pub fn read_from<R: Read>(reader: &mut R) -> io::Result<PublicKey> {
        check_tag(reader, TAG_PUBLIC_KEY)?;
        let fingerprint: u64 = reader.read_u64::<LittleEndian>()?;
        Ok(PublicKey {
            p0: read_rns_poly(reader)?,
            p1: read_rns_poly(reader)?,
            fingerprint,
        })
    }
}

impl EvaluationKeySet {
    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_u8(TAG_EVALUATION_KEYS)?;
        writer.write_u64::<LittleEndian>(self.fingerprint)?;
        writer.write_u64::<LittleEndian>(self.decomposition_bit_count as u64)?;
        writer.write_u64::<LittleEndian>(self.keys.len() as u64)?;
        for key in self.keys.iter() {
            write_ksw_key(writer, key)?;
        }
        Ok(())
    }

    pub fn read_from<R: Read>(reader: &mut R) -> io::Result<EvaluationKeySet> {
        check_tag(reader, TAG_EVALUATION_KEYS)?;
        let fingerprint: u64 = reader.read_u64::<LittleEndian>()?;
        let decomposition_bit_count: usize = reader.read_u64::<LittleEndian>()? as usize;
        let count: usize = reader.read_u64::<LittleEndian>()? as usize;
        let mut keys: Vec<KswKey> = Vec::with_capacity(count);
        for _ in 0..count {
            keys.push(read_ksw_key(reader)?);
        }
        Ok(EvaluationKeySet {
            keys,
            decomposition_bit_count,
            fingerprint,
        })
    }
}

impl GaloisKeySet {
    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_u8(TAG_GALOIS_KEYS)?;
        writer.write_u64::<LittleEndian>(self.fingerprint)?;
        writer.write_u64::<LittleEndian>(self.decomposition_bit_count as u64)?;
        writer.write_u64::<LittleEndian>(self.keys.len() as u64)?;
        // Fixed element order keeps the encoding canonical.
        for elt in self.elements() {
            writer.write_u64::<LittleEndian>(elt)?;
            write_ksw_key(writer, &self.keys[&elt])?;
        }
        Ok(())
    }

    pub fn read_from<R: Read>(reader: &mut R) -> io::Result<GaloisKeySet> {
        check_tag(reader, TAG_GALOIS_KEYS)?;
        let fingerprint: u64 = reader.read_u64::<LittleEndian>()?;
        let decomposition_bit_count: usize = reader.read_u64::<LittleEndian>()? as usize;
        let count: usize = reader.read_u64::<LittleEndian>()? as usize;
        let mut keys: FnvHashMap<u64, KswKey> = FnvHashMap::default();
        for _ in 0..count {
            let elt: u64 = reader.read_u64::<LittleEndian>()?;
            keys.insert(elt, read_ksw_key(reader)?);
        }
        Ok(GaloisKeySet {
            keys,
            decomposition_bit_count,
            fingerprint,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::sync::Arc;

    use super::*;
    use crate::context::Context;
    use crate::encryptor::Encryptor;
    use crate::keygen::KeyGenerator;
    use crate::params::EncryptionParameters;

    fn small_ctx() -> Arc<Context> {
        Arc::new(
            EncryptionParameters::new()
                .set_poly_modulus_degree(16)
                .set_coeff_modulus(otarie_math::primes::primes_of_size(30, 16, 2).unwrap())
                .set_plain_modulus(97)
                .validate()
                .unwrap(),
        )
    }

    fn roundtrip<T>(
        value: &T,
        write: impl Fn(&T, &mut Vec<u8>) -> io::Result<()>,
        read: impl Fn(&mut Cursor<Vec<u8>>) -> io::Result<T>,
    ) -> T {
        let mut bytes: Vec<u8> = Vec::new();
        write(value, &mut bytes).unwrap();
        let mut cursor: Cursor<Vec<u8>> = Cursor::new(bytes);
        read(&mut cursor).unwrap()
    }

    #[test]
    fn test_plaintext_roundtrip() {
        let plain: Plaintext = Plaintext::from_coeffs(vec![1, 0, 96, 42]);
        let back: Plaintext = roundtrip(&plain, Plaintext::write_to, Plaintext::read_from);
        assert_eq!(back, plain);
    }

    #[test]
    fn test_key_and_ciphertext_roundtrip() {
        let ctx: Arc<Context> = small_ctx();
        let mut keygen: KeyGenerator = KeyGenerator::new(ctx.clone());
        let secret: SecretKey = keygen.secret_key();
        let public: PublicKey = keygen.public_key();

        assert_eq!(
            roundtrip(&secret, SecretKey::write_to, SecretKey::read_from),
            secret
        );
        assert_eq!(
            roundtrip(&public, PublicKey::write_to, PublicKey::read_from),
            public
        );

        let mut encryptor: Encryptor = Encryptor::new(ctx.clone(), public).unwrap();
        let ct: Ciphertext = encryptor
            .encrypt(&Plaintext::from_coeffs(vec![5, 7]))
            .unwrap();
        assert_eq!(
            roundtrip(&ct, Ciphertext::write_to, Ciphertext::read_from),
            ct
        );
    }

    #[test]
    fn test_key_set_roundtrips() {
        let ctx: Arc<Context> = small_ctx();
        let mut keygen: KeyGenerator = KeyGenerator::new(ctx.clone());
        let evk: EvaluationKeySet = keygen.generate_evaluation_keys(16, 2).unwrap();
        let glk: GaloisKeySet = keygen.generate_galois_keys(16).unwrap();

        assert_eq!(
            roundtrip(&evk, EvaluationKeySet::write_to, EvaluationKeySet::read_from),
            evk
        );
        assert_eq!(
            roundtrip(&glk, GaloisKeySet::write_to, GaloisKeySet::read_from),
            glk
        );
    }

    #[test]
    fn test_wrong_tag_rejected() {
        let plain: Plaintext = Plaintext::from_coeffs(vec![1, 2, 3]);
        let mut bytes: Vec<u8> = Vec::new();
        plain.write_to(&mut bytes).unwrap();
        let mut cursor: Cursor<Vec<u8>> = Cursor::new(bytes);
        assert!(Ciphertext::read_from(&mut cursor).is_err());
    }
}
