pub mod bls12377;
