pub mod generic_csv;
