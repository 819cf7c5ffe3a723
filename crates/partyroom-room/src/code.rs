//! Room code generation.

use partyroom_protocol::RoomCode;
use rand::Rng;

/// The symbols room codes are drawn from.
pub const ROOM_CODE_ALPHABET: &[u8; 36] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Produces candidate room codes.
///
/// The registry checks every candidate against live rooms and asks again
/// on collision, so a generator doesn't need to guarantee uniqueness.
/// Any `FnMut(usize) -> RoomCode` closure is a generator, which is how
/// tests inject collisions.
pub trait CodeGenerator: Send + 'static {
    /// Returns a candidate code of `len` characters.
    fn generate(&mut self, len: usize) -> RoomCode;
}

impl<F> CodeGenerator for F
where
    F: FnMut(usize) -> RoomCode + Send + 'static,
{
    fn generate(&mut self, len: usize) -> RoomCode {
        self(len)
    }
}

/// Uniformly random codes from [`ROOM_CODE_ALPHABET`].
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomCodes;

impl CodeGenerator for RandomCodes {
    fn generate(&mut self, len: usize) -> RoomCode {
        random_code(len)
    }
}

/// Generates one random code of `len` characters.
pub fn random_code(len: usize) -> RoomCode {
    let mut rng = rand::rng();
    let code: String = (0..len)
        .map(|_| ROOM_CODE_ALPHABET[rng.random_range(0..ROOM_CODE_ALPHABET.len())] as char)
        .collect();
    RoomCode::new(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_code_has_requested_length_and_alphabet() {
        for _ in 0..200 {
            let code = random_code(6);
            assert_eq!(code.as_str().len(), 6);
            assert!(
                code.as_str().bytes().all(|b| ROOM_CODE_ALPHABET.contains(&b)),
                "unexpected symbol in {code}"
            );
        }
    }

    #[test]
    fn test_closure_is_a_code_generator() {
        let mut n = 0;
        let mut generator = move |len: usize| {
            n += 1;
            RoomCode::new(format!("{n:0>len$}"))
        };
        assert_eq!(generator.generate(6).as_str(), "000001");
        assert_eq!(generator.generate(6).as_str(), "000002");
    }
}
