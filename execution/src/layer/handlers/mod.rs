mod bank;
mod round;
