pub mod avatar;
pub mod date;
pub mod quran;
pub mod remind;
