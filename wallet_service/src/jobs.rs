pub mod fx_refresher;
