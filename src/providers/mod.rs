pub mod factsheet;
pub mod price_feed;
pub mod util;
