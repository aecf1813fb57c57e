mod common;
mod promotion;
