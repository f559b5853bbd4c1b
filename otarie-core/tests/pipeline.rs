use std::sync::Arc;

use num_bigint::BigUint;

use otarie_core::{
    standard_parameters, ChooserEncoder, ChooserEvaluator, ChooserPoly, Context, Decryptor,
    EncryptionParameters, Encryptor, Evaluator, IntegerEncoder, KeyGenerator, Plaintext,
    SecurityLevel,
};

/// Encrypts 5 and -7, computes (-a + b) * b and decodes 84.
#[test]
fn test_integer_circuit() {
    let ctx: Arc<Context> = Arc::new(
        EncryptionParameters::new()
            .set_poly_modulus_degree(2048)
            .set_coeff_modulus(standard_parameters(SecurityLevel::Tc128, 2048).unwrap())
            .set_plain_modulus(257)
            .validate()
            .unwrap(),
    );
    let mut keygen: KeyGenerator = KeyGenerator::new(ctx.clone());
    let keys = keygen.generate_evaluation_keys(16, 1).unwrap();
    let mut encryptor: Encryptor = Encryptor::new(ctx.clone(), keygen.public_key()).unwrap();
    let decryptor: Decryptor = Decryptor::new(ctx.clone(), keygen.secret_key()).unwrap();
    let evaluator: Evaluator = Evaluator::new(ctx.clone());
    let encoder: IntegerEncoder = IntegerEncoder::new(ctx.plain_modulus(), 2).unwrap();

    let a = encryptor.encrypt(&encoder.encode(5)).unwrap();
    let b = encryptor.encrypt(&encoder.encode(-7)).unwrap();

    let negated = evaluator.negate(&a).unwrap();
    let sum = evaluator.add(&negated, &b).unwrap();
    let product = evaluator.relinearize(&evaluator.multiply(&sum, &b).unwrap(), &keys).unwrap();

    assert!(decryptor.invariant_noise_budget(&product).unwrap() > 0);
    let decoded: i64 = encoder.decode(&decryptor.decrypt(&product).unwrap()).unwrap();
    assert_eq!(decoded, (-5 + -7) * -7);
}

/// Selects parameters for 42 x^3 - 27 x + 1 at x = 12345, then runs the
/// circuit for real under the selected parameters.
#[test]
fn test_select_parameters_then_evaluate() {
    let chooser_encoder: ChooserEncoder = ChooserEncoder::new(3).unwrap();
    let chooser: ChooserEvaluator = ChooserEvaluator;

    let x: ChooserPoly = chooser_encoder.encode(12345);
    let cube: ChooserPoly = chooser.exponentiate(&x, 3, 60).unwrap();
    let term_a: ChooserPoly = chooser
        .multiply_plain(&cube, 1, BigUint::from(42u64))
        .unwrap();
    let term_b: ChooserPoly = chooser
        .multiply_plain(&x, 1, BigUint::from(27u64))
        .unwrap();
    let diff: ChooserPoly = chooser.sub(&term_a, &term_b).unwrap();
    let result: ChooserPoly = chooser
        .add_plain(&diff, 1, BigUint::from(1u64))
        .unwrap();

    let (parms, dbc): (EncryptionParameters, usize) =
        result.select_parameters(10).unwrap();
    assert_eq!(parms.poly_modulus_degree(), 8192);
    assert_eq!(parms.plain_modulus(), 8192);
    assert!(result.simulate(&parms, dbc).unwrap().decrypts(10));

    let ctx: Arc<Context> = Arc::new(parms.validate().unwrap());
    let mut keygen: KeyGenerator = KeyGenerator::new(ctx.clone());
    let keys = keygen.generate_evaluation_keys(dbc, 1).unwrap();
    let mut encryptor: Encryptor = Encryptor::new(ctx.clone(), keygen.public_key()).unwrap();
    let decryptor: Decryptor = Decryptor::new(ctx.clone(), keygen.secret_key()).unwrap();
    let evaluator: Evaluator = Evaluator::new(ctx.clone());
    let encoder: IntegerEncoder = IntegerEncoder::new(ctx.plain_modulus(), 3).unwrap();

    let x_ct = encryptor.encrypt(&encoder.encode(12345)).unwrap();
    let cube_ct = evaluator.exponentiate(&x_ct, 3, &keys).unwrap();
    let term_a_ct = evaluator
        .multiply_plain(&cube_ct, &Plaintext::from_coeffs(vec![42]))
        .unwrap();
    let term_b_ct = evaluator
        .multiply_plain(&x_ct, &Plaintext::from_coeffs(vec![27]))
        .unwrap();
    let diff_ct = evaluator.sub(&term_a_ct, &term_b_ct).unwrap();
    let result_ct = evaluator
        .add_plain(&diff_ct, &Plaintext::from_coeffs(vec![1]))
        .unwrap();

    assert!(decryptor.invariant_noise_budget(&result_ct).unwrap() > 0);
    let decoded: i64 = encoder
        .decode(&decryptor.decrypt(&result_ct).unwrap())
        .unwrap();
    assert_eq!(decoded, 42 * 12345i64.pow(3) - 27 * 12345 + 1);
}
