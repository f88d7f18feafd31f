//! Gilbert-Elliot two-state bit-error model.

use rand::prelude::*;

const GOOD_STATE: bool = true;
const BAD_STATE: bool = false;

/// Parameters of one directed link's Gilbert-Elliot model.
#[derive(Debug, Clone, Copy)]
pub struct ChannelParams {
    /// Bit error rate while in the good state.
    pub good_state_ber: f64,
    /// Bit error rate while in the bad state.
    pub bad_state_ber: f64,
    /// Good-to-bad transition probability per bit.
    pub good_to_bad_p: f64,
    /// Bad-to-good transition probability per bit.
    pub bad_to_good_p: f64,
}

impl Default for ChannelParams {
    fn default() -> Self {
        Self {
            good_state_ber: 1e-6,
            bad_state_ber: 5e-3,
            good_to_bad_p: 0.002,
            bad_to_good_p: 0.05,
        }
    }
}

/// Gilbert-Elliot model using jump-ahead logic: calculates bit distances to
/// state transitions instead of simulating bit-by-bit, so a multi-kilobyte
/// datagram is one cheap draw instead of thousands.
pub struct GilbertElliotChannel {
    params: ChannelParams,
    state: bool,
    bits_until_next_state_change: i64,
}

impl GilbertElliotChannel {
    /// Creates a new channel in the good state with `params`.
    pub fn new(params: ChannelParams) -> Self {
        let mut channel = Self {
            params,
            state: GOOD_STATE,
            bits_until_next_state_change: 0,
        };
        channel.bits_until_next_state_change = channel.draw_bits_to_transition();
        channel
    }

    fn draw_bits_to_transition(&self) -> i64 {
        let p = if self.state == GOOD_STATE {
            self.params.good_to_bad_p
        } else {
            self.params.bad_to_good_p
        };

        let r: f64 = rand::rng().random();
        (r.ln() / (1.0 - p).ln()).floor() as i64 + 1
    }

    /// Whether a frame of `num_bits` survives transmission, given the
    /// channel's current and evolving state.
    pub fn frame_success(&mut self, num_bits: u64) -> bool {
        let mut bits_processed = 0i64;
        let mut frame_corrupted = false;
        let num_bits = num_bits as i64;

        while bits_processed < num_bits {
            let bits_in_chunk = (num_bits - bits_processed).min(self.bits_until_next_state_change);

            let ber = if self.state == GOOD_STATE {
                self.params.good_state_ber
            } else {
                self.params.bad_state_ber
            };

            if !frame_corrupted {
                let r: f64 = rand::rng().random();
                if r > (1.0 - ber).powf(bits_in_chunk as f64) {
                    frame_corrupted = true;
                }
            }

            bits_processed += bits_in_chunk;
            self.bits_until_next_state_change -= bits_in_chunk;

            if self.bits_until_next_state_change <= 0 {
                self.state = if self.state == GOOD_STATE {
                    BAD_STATE
                } else {
                    GOOD_STATE
                };
                self.bits_until_next_state_change = self.draw_bits_to_transition();
            }
        }

        !frame_corrupted
    }
}
