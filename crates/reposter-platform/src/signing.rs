//! `X-Bogus` request signing for the web API.
//!
//! The value binds a request's query string, body and user agent to a
//! timestamp. It is a fixed-layout 19-byte record (hash fragments, time,
//! environment constant, xor checksum), scrambled with RC4 and written in a
//! permuted base64 alphabet.

use base64::alphabet::Alphabet;
use base64::engine::general_purpose::{GeneralPurpose, NO_PAD, STANDARD};
use base64::Engine;

const XB_ALPHABET: Alphabet =
    match Alphabet::new("Dkdpgh4ZKsQB80/Mfvw36XI1R25-WUAlEi7NLboqYTOPuzmFjJnryx9HVGcaStCe") {
        Ok(alphabet) => alphabet,
        Err(_) => panic!("X-Bogus alphabet must be 64 unique characters"),
    };

const XB_ENGINE: GeneralPurpose = GeneralPurpose::new(&XB_ALPHABET, NO_PAD);

/// Key used to scramble the user agent before hashing.
const UA_KEY: [u8; 3] = [0x00, 0x01, 0x0c];

/// Key used to scramble the final record.
const RECORD_KEY: [u8; 1] = [0xff];

/// Browser environment constant carried in every record.
const ENV_CONSTANT: u32 = 536_919_696;

/// Length of every signature produced.
pub const SIGNATURE_LEN: usize = 28;

/// Signs web API requests for one user agent.
#[derive(Debug, Clone)]
pub struct XBogus {
    ua_digest: [u8; 16],
}

impl XBogus {
    pub fn new(user_agent: &str) -> Self {
        let scrambled = rc4(&UA_KEY, user_agent.as_bytes());
        let encoded = STANDARD.encode(scrambled);
        Self {
            ua_digest: md5::compute(encoded.as_bytes()).0,
        }
    }

    /// Sign `query` (url-encoded) and `body` (compact JSON) at the current time.
    pub fn sign(&self, query: &str, body: &str) -> String {
        let now = chrono::Utc::now().timestamp();
        self.sign_at(query, body, now as u32)
    }

    /// Sign at a fixed unix timestamp.
    pub fn sign_at(&self, query: &str, body: &str, timestamp: u32) -> String {
        let record = self.record(query, body, timestamp);

        let mut permuted = Vec::with_capacity(record.len());
        permuted.extend(record.iter().step_by(2));
        permuted.extend(record.iter().skip(1).step_by(2));

        let mut payload = vec![2u8, 0xff];
        payload.extend(rc4(&RECORD_KEY, &permuted));

        XB_ENGINE.encode(payload)
    }

    fn record(&self, query: &str, body: &str, timestamp: u32) -> [u8; 19] {
        let q = double_md5(query.as_bytes());
        let b = double_md5(body.as_bytes());
        let ua = &self.ua_digest;
        let ts = timestamp.to_be_bytes();
        let env = ENV_CONSTANT.to_be_bytes();

        let mut record = [
            64, 0, 1, 12, q[14], q[15], b[14], b[15], ua[14], ua[15], ts[0], ts[1], ts[2], ts[3],
            env[0], env[1], env[2], env[3], 0,
        ];
        record[18] = record[..18].iter().fold(0u8, |acc, byte| acc ^ byte);
        record
    }
}

fn double_md5(data: &[u8]) -> [u8; 16] {
    md5::compute(md5::compute(data).0).0
}

/// Plain RC4 keystream applied to `data`.
pub(crate) fn rc4(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut state: [u8; 256] = std::array::from_fn(|i| i as u8);

    let mut j: u8 = 0;
    for i in 0..256 {
        j = j
            .wrapping_add(state[i])
            .wrapping_add(key[i % key.len()]);
        state.swap(i, j as usize);
    }

    let (mut i, mut j) = (0u8, 0u8);
    data.iter()
        .map(|byte| {
            i = i.wrapping_add(1);
            j = j.wrapping_add(state[i as usize]);
            state.swap(i as usize, j as usize);
            let k = state[state[i as usize].wrapping_add(state[j as usize]) as usize];
            byte ^ k
        })
        .collect()
}
