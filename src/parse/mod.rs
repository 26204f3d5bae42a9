pub(crate) use at_root_query::parse_at_root_query;
pub(crate) use keyframes::parse_keyframes_selectors;
pub(crate) use media::parse_media_queries;
pub(crate) use stylesheet::ScssParser;

mod at_root_query;
mod keyframes;
mod media;
mod scan;
mod stylesheet;
mod value;
