pub mod bar_chart;
