//! Pixel driver selection.

use std::{
    fmt::Write as _,
    io::{self, Write},
};

use trainpixels_app::core::{DummyDriver, PixelDriver, Result, Settings, Strip, RGB8};

/// Driver type used by the binary.
pub type BoxedDriver = Box<dyn PixelDriver>;

/// Opens the pixel driver requested by the command line flags.
///
/// Hardware failures degrade to the dummy driver only if the settings allow it.
pub fn open(settings: &Settings, dummy: bool, dry_run: bool) -> Result<BoxedDriver> {
    if dry_run {
        log::info!("Rendering the strips to the terminal");
        return Ok(Box::new(PreviewDriver::new(
            settings.track_pixel_length,
            settings.util_pixel_length,
        )));
    }
    if dummy {
        log::info!("Using the dummy pixel driver");
        return Ok(Box::new(DummyDriver));
    }

    match hardware(settings) {
        Ok(driver) => Ok(driver),
        Err(err) if settings.allow_dummy_driver => {
            log::warn!("{err}, falling back to the dummy pixel driver");
            Ok(Box::new(DummyDriver))
        }
        Err(err) => Err(err),
    }
}

#[cfg(feature = "spidev")]
fn hardware(settings: &Settings) -> Result<BoxedDriver> {
    use trainpixels_app::core::SmartLedsDriver;

    let track = spi::SpiWriter::open(&settings.track_pin)?;
    let utility = spi::SpiWriter::open(&settings.util_pin)?;
    Ok(Box::new(SmartLedsDriver::new(
        (track, settings.track_pixel_length),
        (utility, settings.util_pixel_length),
        settings.brightness_level(),
    )))
}

#[cfg(not(feature = "spidev"))]
fn hardware(_settings: &Settings) -> Result<BoxedDriver> {
    Err(trainpixels_app::TrainpixelsError::hardware(
        "the binary is built without the `spidev` feature",
    ))
}

#[cfg(feature = "spidev")]
mod spi {
    use std::io::{self, Write as _};

    use smart_leds::{SmartLedsWrite, RGB8};
    use spidev::{SpiModeFlags, Spidev, SpidevOptions};
    use trainpixels_app::{
        core::ws2812_spi::{make_frame, size_of_frame, SPI_FREQUENCY_HZ},
        TrainpixelsError, TrainpixelsResult,
    };

    /// WS2812 strip connected to a Linux spidev device.
    pub struct SpiWriter {
        spi: Spidev,
        frame: Vec<u8>,
    }

    impl SpiWriter {
        pub fn open(path: &str) -> TrainpixelsResult<Self> {
            let configure = || -> io::Result<Spidev> {
                let mut spi = Spidev::open(path)?;
                let options = SpidevOptions::new()
                    .bits_per_word(8)
                    .max_speed_hz(SPI_FREQUENCY_HZ)
                    .mode(SpiModeFlags::SPI_MODE_0)
                    .build();
                spi.configure(&options)?;
                Ok(spi)
            };

            let spi = configure()
                .map_err(|err| TrainpixelsError::hardware(format!("{path}: {err}")))?;
            log::info!("Opened {path} at {SPI_FREQUENCY_HZ}Hz");
            Ok(Self {
                spi,
                frame: Vec::new(),
            })
        }
    }

    impl SmartLedsWrite for SpiWriter {
        type Error = io::Error;
        type Color = RGB8;

        fn write<T, I>(&mut self, iterator: T) -> Result<(), Self::Error>
        where
            T: Iterator<Item = I>,
            I: Into<Self::Color>,
        {
            let (len, _) = iterator.size_hint();
            self.frame.clear();
            self.frame.reserve(size_of_frame(len));
            self.frame.extend(make_frame(iterator.map(Into::into)));
            self.spi.write_all(&self.frame)
        }
    }
}

/// Prints every flushed strip as a row of 24-bit color blocks.
struct PreviewDriver {
    staged: [Vec<RGB8>; 2],
}

impl PreviewDriver {
    fn new(track_len: usize, utility_len: usize) -> Self {
        Self {
            staged: [
                vec![RGB8::default(); track_len],
                vec![RGB8::default(); utility_len],
            ],
        }
    }

    fn slot(strip: Strip) -> usize {
        match strip {
            Strip::Track => 0,
            Strip::Utility => 1,
        }
    }

    fn render(&self, strip: Strip) -> String {
        let mut line = format!("{strip:>7} ");
        for pixel in &self.staged[Self::slot(strip)] {
            // Writing into a `String` never fails.
            let _ = write!(line, "\x1b[38;2;{};{};{}m\u{25cf}", pixel.r, pixel.g, pixel.b);
        }
        line.push_str("\x1b[0m\n");
        line
    }
}

impl PixelDriver for PreviewDriver {
    fn set_pixel(&mut self, strip: Strip, index: usize, color: RGB8) -> Result<()> {
        if let Some(pixel) = self.staged[Self::slot(strip)].get_mut(index) {
            *pixel = color;
        }
        Ok(())
    }

    fn flush(&mut self, strip: Strip) -> Result<()> {
        io::stdout()
            .lock()
            .write_all(self.render(strip).as_bytes())
            .map_err(trainpixels_app::TrainpixelsError::hardware)
    }

    fn clear_all(&mut self, strip: Strip) -> Result<()> {
        self.staged[Self::slot(strip)].fill(RGB8::default());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_renders_staged_pixels() {
        let mut driver = PreviewDriver::new(2, 1);
        driver
            .set_pixel(Strip::Track, 1, RGB8::new(255, 0, 16))
            .unwrap();
        // Out of range pixels are ignored.
        driver.set_pixel(Strip::Track, 5, RGB8::new(1, 2, 3)).unwrap();

        assert_eq!(
            driver.render(Strip::Track),
            "  track \x1b[38;2;0;0;0m\u{25cf}\x1b[38;2;255;0;16m\u{25cf}\x1b[0m\n"
        );

        driver.clear_all(Strip::Track).unwrap();
        assert_eq!(
            driver.render(Strip::Utility),
            "utility \x1b[38;2;0;0;0m\u{25cf}\x1b[0m\n"
        );
    }
}
