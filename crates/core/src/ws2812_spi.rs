//! WS2812 frame encoding for an SPI bus clocked at [`SPI_FREQUENCY_HZ`].
//!
//! Every LED data bit is sent as four SPI bits, so a single SPI byte carries two data bits.

use smart_leds::RGB8;

/// SPI clock frequency the encoding is designed for.
pub const SPI_FREQUENCY_HZ: u32 = 3_200_000;

const COLOR_CMD_LEN: usize = 12;
// 50 zero bytes take 125us at 3.2MHz, well above the 50us latch time.
const BLANK_LINE_LEN: usize = 50;
const BLANK_LINE: [u8; BLANK_LINE_LEN] = [0_u8; BLANK_LINE_LEN];
const PATTERNS: [u8; 4] = [0b1000_1000, 0b1000_1110, 0b1110_1000, 0b1110_1110];

/// Returns the number of SPI bytes of a frame with the given number of pixels.
pub const fn size_of_frame(pixels: usize) -> usize {
    BLANK_LINE_LEN + COLOR_CMD_LEN * pixels
}

/// Encodes a single pixel, the strip expects the GRB channel order.
fn encode_pixel(pixel: RGB8) -> [u8; COLOR_CMD_LEN] {
    let mut led_bytes = [0_u8; COLOR_CMD_LEN];
    for (i, mut color) in [pixel.g, pixel.r, pixel.b].into_iter().enumerate() {
        for j in 0..4 {
            let pattern = ((color & 0b1100_0000) >> 6) as usize;
            led_bytes[i * 4 + j] = PATTERNS[pattern];
            color <<= 2;
        }
    }
    led_bytes
}

/// Encodes the pixels followed by the latch sequence.
pub fn make_frame(pixels: impl IntoIterator<Item = RGB8>) -> impl Iterator<Item = u8> {
    pixels.into_iter().flat_map(encode_pixel).chain(BLANK_LINE)
}
