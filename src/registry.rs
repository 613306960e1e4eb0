//! The priority ordered set of providers.

use crate::{
  bmp::BmpProvider, providers::YuvProvider, DecoderProvider, FileFormat, ImageDecoder,
  IoContext, Recognition, Result,
};

/// An ordered collection of [DecoderProvider]s.
///
/// Providers are kept sorted by [priority](DecoderProvider::priority), and
/// providers with equal priority stay in the order they were registered.
/// Don't change a registry while it's creating a decoder.
#[derive(Default)]
pub struct Registry {
  providers: Vec<Box<dyn DecoderProvider>>,
}

impl core::fmt::Debug for Registry {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    f.debug_list().entries(self.providers.iter().map(|p| (p.name(), p.priority()))).finish()
  }
}

impl Registry {
  /// An empty registry.
  #[inline]
  #[must_use]
  pub fn new() -> Self {
    Self::default()
  }

  /// A registry with every provider this build of the crate has.
  pub fn with_default_providers() -> Result<Self> {
    let mut r = Self::new();
    r.register_default_providers()?;
    Ok(r)
  }

  /// Adds every provider this build of the crate has.
  pub fn register_default_providers(&mut self) -> Result<()> {
    #[cfg(feature = "jpeg")]
    self.register_provider(Box::new(crate::providers::JpegProvider))?;
    #[cfg(feature = "png")]
    self.register_provider(Box::new(crate::providers::PngProvider))?;
    #[cfg(feature = "tiff")]
    self.register_provider(Box::new(crate::providers::TiffProvider))?;
    self.register_provider(Box::new(BmpProvider))?;
    self.register_provider(Box::new(YuvProvider))?;
    Ok(())
  }

  /// Inserts a provider after all others of the same or higher priority.
  ///
  /// ## Failure
  /// * `OutOfMemory` if the registry can't grow.
  pub fn register_provider(&mut self, provider: Box<dyn DecoderProvider>) -> Result<()> {
    self.providers.try_reserve(1)?;
    let priority = provider.priority();
    let at = self.providers.partition_point(|p| p.priority() <= priority);
    tracing::trace!(name = provider.name(), priority, at, "registering provider");
    self.providers.insert(at, provider);
    Ok(())
  }

  /// Removes every provider with the given name.
  pub fn disable_provider(&mut self, name: &str) {
    self.providers.retain(|p| p.name() != name);
  }

  /// Provider names, in the order they'll be tried.
  pub fn provider_names(&self) -> impl Iterator<Item = &'static str> + '_ {
    self.providers.iter().map(|p| p.name())
  }

  #[inline]
  #[must_use]
  pub fn is_empty(&self) -> bool {
    self.providers.is_empty()
  }

  /// Finds a decoder for `io`.
  ///
  /// Each provider is tried in turn. When a provider declines a seekable
  /// stream, the stream is put back to where it started before the next
  /// provider sees it.
  ///
  /// * `Ok(None)` when no provider claims the stream.
  /// * An error from a provider is returned as is.
  pub fn create_decoder<'a>(
    &self, path: Option<&str>, format: Option<&FileFormat>, io: Box<dyn IoContext + 'a>,
  ) -> Result<Option<Box<dyn ImageDecoder + 'a>>> {
    let start = io.tell();
    let mut io = io;
    for provider in &self.providers {
      match provider.create_decoder(path, format, io)? {
        Recognition::Decoder(decoder) => {
          tracing::debug!(provider = provider.name(), path, "provider claimed stream");
          return Ok(Some(decoder));
        }
        Recognition::Declined(back) => {
          io = back;
          if io.seekable() && io.tell() != start {
            tracing::debug!(provider = provider.name(), from = io.tell(), to = start, "rolling back");
            io.seek_set(start)?;
          }
        }
      }
    }
    tracing::debug!(path, "no provider claimed stream");
    Ok(None)
  }
}
