mod country_cache;
mod geo_provider;

pub use country_cache::CountryCache;
pub use geo_provider::GeoProvider;
