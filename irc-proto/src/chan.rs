//! An extension trait that checks whether a target names a channel.

/// Channel prefixes assumed until the server advertises `CHANTYPES`.
pub const DEFAULT_CHANTYPES: &str = "#&";

/// An extension trait giving strings a function to check if they are a channel.
pub trait ChannelExt {
    /// Returns true if the name starts with one of the default channel prefixes.
    fn is_channel_name(&self) -> bool {
        self.is_channel_name_in(DEFAULT_CHANTYPES)
    }

    /// Returns true if the name starts with one of `chantypes`.
    fn is_channel_name_in(&self, chantypes: &str) -> bool;
}

impl ChannelExt for str {
    fn is_channel_name_in(&self, chantypes: &str) -> bool {
        self.chars().next().map_or(false, |c| chantypes.contains(c))
    }
}

impl ChannelExt for String {
    fn is_channel_name_in(&self, chantypes: &str) -> bool {
        self.as_str().is_channel_name_in(chantypes)
    }
}

#[cfg(test)]
mod test {
    use super::ChannelExt;

    #[test]
    fn default_chantypes() {
        assert!("#athena".is_channel_name());
        assert!("&local".is_channel_name());
        assert!(!"athena".is_channel_name());
        assert!(!"".is_channel_name());
    }

    #[test]
    fn advertised_chantypes() {
        assert!("!12345chan".is_channel_name_in("#!"));
        assert!(!"&local".is_channel_name_in("#"));
    }
}
