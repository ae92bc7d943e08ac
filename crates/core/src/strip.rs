//! LED strip buffers and pixel drivers.

use core::fmt;

use smart_leds::{brightness, SmartLedsWrite, RGB8};

use crate::{Error, Result};

/// One of the two independently addressable LED strips.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Strip {
    /// Train position pixels.
    Track,
    /// Indicator light pixels, including the status LED.
    Utility,
}

impl Strip {
    pub const ALL: [Self; 2] = [Self::Track, Self::Utility];

    const fn slot(self) -> usize {
        match self {
            Self::Track => 0,
            Self::Utility => 1,
        }
    }
}

impl fmt::Display for Strip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Track => f.pad("track"),
            Self::Utility => f.pad("utility"),
        }
    }
}

/// The capability to show pixels on a physical LED strip.
///
/// Setting a pixel only stages it, the staged pixels become visible after [`Self::flush`].
pub trait PixelDriver {
    /// Stages a pixel color.
    fn set_pixel(&mut self, strip: Strip, index: usize, color: RGB8) -> Result<()>;
    /// Sends the staged pixels to the strip.
    fn flush(&mut self, strip: Strip) -> Result<()>;
    /// Stages every pixel of the strip as black.
    fn clear_all(&mut self, strip: Strip) -> Result<()>;
}

impl<T: PixelDriver + ?Sized> PixelDriver for &mut T {
    fn set_pixel(&mut self, strip: Strip, index: usize, color: RGB8) -> Result<()> {
        T::set_pixel(self, strip, index, color)
    }

    fn flush(&mut self, strip: Strip) -> Result<()> {
        T::flush(self, strip)
    }

    fn clear_all(&mut self, strip: Strip) -> Result<()> {
        T::clear_all(self, strip)
    }
}

impl<T: PixelDriver + ?Sized> PixelDriver for Box<T> {
    fn set_pixel(&mut self, strip: Strip, index: usize, color: RGB8) -> Result<()> {
        T::set_pixel(self, strip, index, color)
    }

    fn flush(&mut self, strip: Strip) -> Result<()> {
        T::flush(self, strip)
    }

    fn clear_all(&mut self, strip: Strip) -> Result<()> {
        T::clear_all(self, strip)
    }
}

/// In-memory pixels of a single strip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    strip: Strip,
    pixels: Vec<RGB8>,
    dirty: bool,
}

impl PixelBuffer {
    pub fn new(strip: Strip, len: usize) -> Self {
        Self {
            strip,
            pixels: vec![RGB8::default(); len],
            dirty: false,
        }
    }

    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    /// Returns true if the buffer has been changed since the last flush.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn get(&self, index: usize) -> Option<RGB8> {
        self.pixels.get(index).copied()
    }

    pub fn as_slice(&self) -> &[RGB8] {
        &self.pixels
    }

    /// Writes a pixel, the buffer becomes dirty only if the color actually changes.
    pub fn set(&mut self, index: usize, color: RGB8) -> Result<()> {
        let len = self.pixels.len();
        let pixel = self.pixels.get_mut(index).ok_or(Error::PixelOutOfRange {
            strip: self.strip,
            index,
            len,
        })?;

        if *pixel != color {
            *pixel = color;
            self.dirty = true;
        }
        Ok(())
    }

    /// Fills the whole buffer with the given color except the `keep` pixel.
    pub fn fill_except(&mut self, color: RGB8, keep: Option<usize>) {
        for (index, pixel) in self.pixels.iter_mut().enumerate() {
            if Some(index) != keep && *pixel != color {
                *pixel = color;
                self.dirty = true;
            }
        }
    }
}

/// The pair of strip buffers together with the driver that shows them.
///
/// Buffer writes are pure memory mutations, the driver is involved only by
/// [`Self::flush_changed`] and [`Self::reset`].
#[derive(Debug)]
pub struct Pixels<D> {
    buffers: [PixelBuffer; 2],
    driver: D,
}

impl<D: PixelDriver> Pixels<D> {
    pub fn new(driver: D, track_len: usize, utility_len: usize) -> Self {
        Self {
            buffers: [
                PixelBuffer::new(Strip::Track, track_len),
                PixelBuffer::new(Strip::Utility, utility_len),
            ],
            driver,
        }
    }

    pub fn buffer(&self, strip: Strip) -> &PixelBuffer {
        &self.buffers[strip.slot()]
    }

    pub fn buffer_mut(&mut self, strip: Strip) -> &mut PixelBuffer {
        &mut self.buffers[strip.slot()]
    }

    pub fn get(&self, strip: Strip, index: usize) -> Option<RGB8> {
        self.buffer(strip).get(index)
    }

    pub fn set(&mut self, strip: Strip, index: usize, color: RGB8) -> Result<()> {
        self.buffer_mut(strip).set(index, color)
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    /// Sends every changed buffer to the driver and flushes it exactly once.
    ///
    /// Returns the number of flushed strips.
    pub fn flush_changed(&mut self) -> Result<usize> {
        let mut flushed = 0;
        for buffer in &mut self.buffers {
            if !buffer.dirty {
                continue;
            }

            for (index, color) in buffer.pixels.iter().enumerate() {
                self.driver.set_pixel(buffer.strip, index, *color)?;
            }
            self.driver.flush(buffer.strip)?;
            buffer.dirty = false;
            flushed += 1;
        }
        Ok(flushed)
    }

    /// Blanks both strips, in memory and on the hardware.
    pub fn reset(&mut self) -> Result<()> {
        for buffer in &mut self.buffers {
            buffer.pixels.fill(RGB8::default());
            buffer.dirty = false;

            self.driver.clear_all(buffer.strip)?;
            self.driver.flush(buffer.strip)?;
        }
        Ok(())
    }

    pub fn into_driver(self) -> D {
        self.driver
    }
}

/// Pixel driver that does not perform any hardware I/O.
#[derive(Debug, Default, Clone, Copy)]
pub struct DummyDriver;

impl PixelDriver for DummyDriver {
    fn set_pixel(&mut self, strip: Strip, index: usize, color: RGB8) -> Result<()> {
        log::trace!("{strip}[{index}] <- {color:?}");
        Ok(())
    }

    fn flush(&mut self, strip: Strip) -> Result<()> {
        log::trace!("{strip} flushed");
        Ok(())
    }

    fn clear_all(&mut self, strip: Strip) -> Result<()> {
        log::trace!("{strip} cleared");
        Ok(())
    }
}

/// Pixel driver that keeps the last shown frame of every strip in memory.
#[derive(Debug, Default, Clone)]
pub struct MemoryDriver {
    staged: [Vec<RGB8>; 2],
    shown: [Vec<RGB8>; 2],
    flushes: [usize; 2],
}

impl MemoryDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the pixels that are currently visible on the strip.
    pub fn shown(&self, strip: Strip) -> &[RGB8] {
        &self.shown[strip.slot()]
    }

    /// Returns the visible color of a single pixel.
    pub fn shown_pixel(&self, strip: Strip, index: usize) -> RGB8 {
        self.shown(strip).get(index).copied().unwrap_or_default()
    }

    /// Returns the indices of the visible pixels that are not black.
    pub fn lit(&self, strip: Strip) -> Vec<usize> {
        self.shown(strip)
            .iter()
            .enumerate()
            .filter(|(_, color)| **color != RGB8::default())
            .map(|(index, _)| index)
            .collect()
    }

    /// Returns the total number of flushes of the strip.
    pub fn flush_count(&self, strip: Strip) -> usize {
        self.flushes[strip.slot()]
    }
}

impl PixelDriver for MemoryDriver {
    fn set_pixel(&mut self, strip: Strip, index: usize, color: RGB8) -> Result<()> {
        let staged = &mut self.staged[strip.slot()];
        if staged.len() <= index {
            staged.resize(index + 1, RGB8::default());
        }
        staged[index] = color;
        Ok(())
    }

    fn flush(&mut self, strip: Strip) -> Result<()> {
        let slot = strip.slot();
        self.shown[slot].clone_from(&self.staged[slot]);
        self.flushes[slot] += 1;
        Ok(())
    }

    fn clear_all(&mut self, strip: Strip) -> Result<()> {
        self.staged[strip.slot()].fill(RGB8::default());
        Ok(())
    }
}

/// Pixel driver on top of a pair of [`SmartLedsWrite`] strip writers.
///
/// The global brightness is applied while flushing.
pub struct SmartLedsDriver<T, U> {
    track: T,
    utility: U,
    staged: [Vec<RGB8>; 2],
    brightness: u8,
}

impl<T, U> SmartLedsDriver<T, U>
where
    T: SmartLedsWrite<Color = RGB8>,
    U: SmartLedsWrite<Color = RGB8>,
    T::Error: fmt::Debug,
    U::Error: fmt::Debug,
{
    pub fn new(track: (T, usize), utility: (U, usize), brightness: u8) -> Self {
        Self {
            track: track.0,
            utility: utility.0,
            staged: [
                vec![RGB8::default(); track.1],
                vec![RGB8::default(); utility.1],
            ],
            brightness,
        }
    }
}

impl<T, U> PixelDriver for SmartLedsDriver<T, U>
where
    T: SmartLedsWrite<Color = RGB8>,
    U: SmartLedsWrite<Color = RGB8>,
    T::Error: fmt::Debug,
    U::Error: fmt::Debug,
{
    fn set_pixel(&mut self, strip: Strip, index: usize, color: RGB8) -> Result<()> {
        let staged = &mut self.staged[strip.slot()];
        let len = staged.len();
        let pixel = staged
            .get_mut(index)
            .ok_or(Error::PixelOutOfRange { strip, index, len })?;
        *pixel = color;
        Ok(())
    }

    fn flush(&mut self, strip: Strip) -> Result<()> {
        let pixels = brightness(self.staged[strip.slot()].iter().copied(), self.brightness);
        let result = match strip {
            Strip::Track => self.track.write(pixels).map_err(|err| format!("{err:?}")),
            Strip::Utility => self.utility.write(pixels).map_err(|err| format!("{err:?}")),
        };
        result.map_err(|err| Error::hardware(format!("{strip} strip: {err}")))
    }

    fn clear_all(&mut self, strip: Strip) -> Result<()> {
        self.staged[strip.slot()].fill(RGB8::default());
        Ok(())
    }
}
