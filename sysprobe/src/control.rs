use aya::maps::{HashMap, Map, MapData, MapError};
use sysprobe_common::{Config, CONFIG_KEY};

use crate::Result;

/// Single-slot store for the probes' [`Config`], key fixed at [`CONFIG_KEY`].
pub trait ControlStore {
	/// Overwrites the slot.
	fn set(&mut self, config: Config) -> Result<()>;

	/// `None` until the first `set`.
	fn get(&self) -> Result<Option<Config>>;
}

/// `CONFIG_MAP` of the loaded object. A one-entry hash map rather than an array so that a
/// probe's lookup misses until userspace has written the slot.
pub struct MapControlStore<'a> {
	map: HashMap<&'a mut MapData, u32, Config>,
}

impl<'a> MapControlStore<'a> {
	pub fn new(map: &'a mut Map) -> Result<Self> {
		Ok(Self {
			map: HashMap::try_from(map)?,
		})
	}
}

impl ControlStore for MapControlStore<'_> {
	fn set(&mut self, config: Config) -> Result<()> {
		self.map.insert(CONFIG_KEY, config, 0)?;
		Ok(())
	}

	fn get(&self) -> Result<Option<Config>> {
		match self.map.get(&CONFIG_KEY, 0) {
			Ok(config) => Ok(Some(config)),
			Err(MapError::KeyNotFound) => Ok(None),
			Err(err) => Err(err.into()),
		}
	}
}

#[cfg(test)]
#[derive(Default)]
pub struct MemoryControlStore {
	slot: Option<Config>,
}

#[cfg(test)]
impl ControlStore for MemoryControlStore {
	fn set(&mut self, config: Config) -> Result<()> {
		self.slot = Some(config);
		Ok(())
	}

	fn get(&self) -> Result<Option<Config>> {
		Ok(self.slot)
	}
}

// region:    --- Tests


// endregion: --- Tests
