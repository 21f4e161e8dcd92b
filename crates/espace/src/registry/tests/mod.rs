mod common;
mod routing;
mod sequence;
