pub mod karin;
