crate::define_id_enum! {
    /// Build strategy identifier, listed in detection priority order
    StrategyId {
        NoLockfile => "no-lockfile" : "Ruby/NoLockfile",
        Rails8 => "rails8" : "Ruby/Rails",
        Rails7 => "rails7" : "Ruby/Rails",
        Rails6 => "rails6" : "Ruby/Rails",
        Rails5 => "rails5" : "Ruby/Rails",
        Rails42 => "rails42" : "Ruby/Rails",
        Rails41 => "rails41" : "Ruby/Rails",
        Rails4 => "rails4" : "Ruby/Rails",
        Rails3 => "rails3" : "Ruby/Rails",
        Rails2 => "rails2" : "Ruby/Rails",
        Rack => "rack" : "Ruby/Rack",
        Ruby => "ruby" : "Ruby",
    }
}

impl StrategyId {
    pub fn is_rails(&self) -> bool {
        matches!(
            self,
            Self::Rails8
                | Self::Rails7
                | Self::Rails6
                | Self::Rails5
                | Self::Rails42
                | Self::Rails41
                | Self::Rails4
                | Self::Rails3
                | Self::Rails2
        )
    }

    /// Rails versions whose assets are compiled with the cached sprockets flow.
    pub fn uses_cached_assets(&self) -> bool {
        self.is_rails() && !matches!(self, Self::Rails3 | Self::Rails2)
    }
}
